use std::io::Write;

use lamb_core::lexer::prelude::{Lexer, Token};

const PROMPT: &str = "lex> ";

/// Prints the lexemes of every line read until `.exit` or end of input.
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
            _ => {
                let lexer = Lexer::new(line.char_indices().map(|(i, c)| (i as u32, c)));

                for lexeme in lexer {
                    match lexeme {
                        Ok((start, token, end)) => {
                            println!("{start:>4}..{end:<4} {token:?}");

                            if token == Token::Eof {
                                break;
                            }
                        },
                        Err(err) => {
                            let (title, details) = err.details();
                            println!("[at {}] Lexical error: {title}", err.location.start);
                            for detail in details {
                                println!("    {detail}");
                            }
                            break;
                        }
                    }
                }
            }
        }
    }
}
