use std::io::Write;

use lamb_core::parser::prelude::parse_module_from_stream;

const PROMPT: &str = "parse> ";

/// Prints the surface tree of every line read until `.exit` or end of
/// input. Declarations only last for their line.
pub fn start() -> std::io::Result<()> {
    let stdin = std::io::stdin();

    loop {
        let mut input = String::new();

        print!("{PROMPT}");
        std::io::stdout().flush()?;
        if stdin.read_line(&mut input)? == 0 {
            return Ok(());
        }

        let line = input.trim_end_matches(['\n', '\r']);
        match line {
            "" => {},
            ".exit" => return Ok(()),
            _ => match parse_module_from_stream(line.chars()) {
                Ok(parsed) => println!("{parsed}"),
                Err(err) => {
                    let (title, details) = err.details();
                    println!("[at {}] Parse error: {title}", err.span.start);
                    for detail in details {
                        println!("    {detail}");
                    }
                },
            },
        }
    }
}
