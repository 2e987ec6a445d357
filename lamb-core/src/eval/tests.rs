use std::{
    path::PathBuf,
    rc::Rc,
    sync::{atomic::AtomicBool, Arc},
};

use crate::{
    binder::{bind, prelude::{Global, Module}},
    term::prelude::{live_nodes, Builtin, Origin, Tag, Term},
    utils::prelude::{Error, NullWarningEmitterIO, SrcSpan},
};
use super::{prelude::{FaultKind, Machine, Options}, run};

fn bound(src: &str) -> Result<Module, Error> {
    bind(PathBuf::from("test.lamb"), src.into(), Rc::new(NullWarningEmitterIO))
}

struct Ran {
    result: Result<Option<String>, FaultKind>,
    output: String,
    errors: String,
}

fn execute(src: &str, input: &[u8]) -> Result<Ran, Error> {
    let module = bound(src)?;
    let mut output = vec![];
    let mut errors = vec![];

    let options = Options { test: true, ..Options::default() };
    let result = run(&module, options, input, &mut output, &mut errors, None)
        .map(|outcome| outcome.value.map(|value| value.to_string()))
        .map_err(|fault| fault.kind);

    Ok(Ran {
        result,
        output: String::from_utf8_lossy(&output).into_owned(),
        errors: String::from_utf8_lossy(&errors).into_owned(),
    })
}

fn value(src: &str) -> Result<String, Error> {
    match execute(src, b"")?.result {
        Ok(Some(value)) => Ok(value),
        other => panic!("`{src}` gave {other:?}"),
    }
}

fn fault(src: &str) -> Result<FaultKind, Error> {
    match execute(src, b"")?.result {
        Err(kind) => Ok(kind),
        Ok(value) => panic!("`{src}` gave {value:?}"),
    }
}

#[test]
fn test_integer_prints_itself() -> Result<(), Error> {
    assert_eq!(value("42")?, "42");
    assert_eq!(value("1 + 2 * 3")?, "7");
    assert_eq!(value("(0 - 7) / 2")?, "-3");
    assert_eq!(value("7 % 3 + 10 - 4")?, "7");
    assert_eq!(value("if 1 < 2 && 2 <= 2 then 10 else 20")?, "10");
    assert_eq!(value("not (3 != 3) || false")?, "(\\t f -> t)");

    Ok(())
}

#[test]
fn test_arithmetic_faults() -> Result<(), Error> {
    assert_eq!(fault("9223372036854775807 + 1")?, FaultKind::Overflow { builtin: "+".into() });
    assert_eq!(fault("(0 - 9223372036854775807 - 1) / (0 - 1)")?, FaultKind::Overflow { builtin: "/".into() });
    assert_eq!(fault("1 / 0")?, FaultKind::DivideByZero);
    assert_eq!(fault("1 % 0")?, FaultKind::ModuloByZero);
    assert_eq!(fault("put 256")?, FaultKind::ByteRange { value: 256 });
    assert_eq!(fault("1 + (x -> x)")?, FaultKind::TypeMismatch { builtin: "+".into() });
    assert_eq!(fault("(+) 1")?, FaultKind::MissingArgument { builtin: "+".into() });

    Ok(())
}

#[test]
fn test_fault_location() -> Result<(), Error> {
    let module = bound("f x = x / 0\nf 1")?;
    let options = Options { backtrace: true, ..Options::default() };
    let Err(fault) = run(&module, options, &b""[..], std::io::sink(), std::io::sink(), None) else {
        panic!("expected a fault");
    };

    assert_eq!(fault.kind, FaultKind::DivideByZero);
    assert_eq!(fault.location, Some(SrcSpan::from(8, 9)));
    assert_eq!(fault.backtrace, vec!["f".to_string()]);

    let error = Error::Runtime { path: module.path.clone(), src: module.src.clone(), fault };
    assert_eq!(error.exit_code(), 1);
    assert!(error.pretty_string().contains("Division by zero"));

    Ok(())
}

#[test]
#[test_log::test]
fn test_abort() -> Result<(), Error> {
    let ran = execute("main _ =\n  puts \"out\"\n  error \"boom\\n\"", b"")?;

    assert_eq!(ran.result, Err(FaultKind::Abort));
    assert_eq!(ran.output, "out");
    assert_eq!(ran.errors, "boom\n");

    let module = bound("head []")?;
    let options = Options { backtrace: true, ..Options::default() };
    let Err(fault) = run(&module, options, &b""[..], std::io::sink(), std::io::sink(), None) else {
        panic!("expected a fault");
    };

    // the prelude's `error` is blamed on the module's `head`
    assert_eq!(fault.kind, FaultKind::Abort);
    assert_eq!(fault.location, Some(SrcSpan::from(0, 4)));
    assert_eq!(fault.backtrace, vec!["error".to_string(), "head".to_string()]);

    Ok(())
}

#[test]
#[test_log::test]
fn test_memoization() -> Result<(), Error> {
    let ran = execute("main _ =\n  let x = put 65\n  x\n  x\n  0", b"")?;

    assert_eq!(ran.result, Ok(None));
    assert_eq!(ran.output, "A");

    // a partially applied builtin is shared too
    assert_eq!(value("(f -> f 2 + f 3) ((+) 1)")?, "7");

    Ok(())
}

#[test]
fn test_lazy_input() -> Result<(), Error> {
    let module = bound("main input =\n  put (head input)\n  0")?;
    let mut output = vec![];

    {
        let mut machine = Machine::new(&module.globals, &b"xyz"[..], &mut output, std::io::sink(), Options::default());
        let _ = machine.run(module.entry.term());

        assert_eq!(machine.input().reads(), 1);
        assert_eq!(machine.input().cached(), 1);
    }
    assert_eq!(output, b"x");

    let module = bound("get 1 + get 1 + get 5")?;
    let mut machine = Machine::new(&module.globals, &b"ab"[..], std::io::sink(), std::io::sink(), Options::default());
    let value = machine.run(module.entry.term()).map_err(|fault| Error::Runtime {
        path: module.path.clone(),
        src: module.src.clone(),
        fault,
    })?;

    // two bytes and the end of input, each read once
    assert_eq!(value.as_int(), Some(i64::from(b'b') * 2 - 1));
    assert_eq!(machine.input().reads(), 3);

    Ok(())
}

#[test]
fn test_echo() -> Result<(), Error> {
    let ran = execute("main input = puts input", b"hello\nworld\n")?;

    assert_eq!(ran.result, Ok(None));
    assert_eq!(ran.output, "hello\nworld\n");

    let ran = execute("main input = puts (map (c -> c + 1) input)", b"HAL")?;
    assert_eq!(ran.output, "IBM");

    Ok(())
}

#[test]
#[test_log::test]
fn test_data_dispatch() -> Result<(), Error> {
    let shapes = "
Shape = {Circle r, Rect w h}
area s = Shape s (r -> 3 * r * r) (w h -> w * h)
";

    assert_eq!(value(&format!("{shapes}area (Rect 2 5) + area (Circle 1)"))?, "13");
    assert_eq!(value(&format!("{shapes}case_Circle (Rect 1 2) (r -> r) 0"))?, "0");
    assert_eq!(value(&format!("{shapes}case_Circle (Circle 7) (r -> r) 0"))?, "7");
    assert_eq!(value(&format!("{shapes}case_Rect (Rect 4 5) (w h -> w - h) 0"))?, "-1");

    Ok(())
}

#[test]
fn test_prelude() -> Result<(), Error> {
    assert_eq!(value("length (map (* 2) [1, 2, 3]) + sum (filter (x -> x > 1) [1, 2, 3])")?, "8");
    assert_eq!(value("swap (a, b) = (b, a)\nfst (swap (1, 2))")?, "2");
    assert_eq!(value("fact n = if n == 0 then 1 else n * fact (n - 1)\nfact 10")?, "3628800");
    assert_eq!(value("(flip (-) 1 . const 10) 99")?, "9");
    assert_eq!(value("head (tail \"abc\")")?, "98");
    assert_eq!(value("null [] && not (null [1])")?, "(\\t f -> t)");

    let ran = execute("main _ = puts (show (0 - 42) ++ \"\\n\")", b"")?;
    assert_eq!(ran.output, "-42\n");

    Ok(())
}

#[test]
fn test_numerals_iterate() -> Result<(), Error> {
    assert_eq!(value("3 (x -> x + 2) 1")?, "7");
    assert_eq!(value("0 (x -> x + 2) 1")?, "1");
    assert_eq!(value("2 2 (x -> x * 3) 1")?, "81");

    Ok(())
}

#[test]
fn test_blocks_and_sections() -> Result<(), Error> {
    let src = "
f n =
  let (a, b) = (n, n + 1)
  let g x = x * b
  g a
f 4
";
    assert_eq!(value(src)?, "20");
    assert_eq!(value("(- 1) 5 + (10 -) 3")?, "11");

    Ok(())
}

#[test]
fn test_loop() {
    // `x = (+) x 1` bound without a fixed point, so `x` demands itself
    let x = Tag::with_origin("x", SrcSpan::from(0, 1), Origin::Module);
    let globals = vec![Global {
        tag: x.clone(),
        term: Term::apply_all(Term::builtin(Builtin::Add, Tag::synthetic("+")), [
            Term::global(0, x.clone()),
            Term::int(1),
        ]),
    }];

    let mut machine = Machine::new(&globals, &b""[..], std::io::sink(), std::io::sink(), Options::default());
    let result = machine.run(&Term::global(0, x));

    assert_eq!(result.map_err(|fault| fault.kind).err(), Some(FaultKind::Loop));
}

#[test]
fn test_interrupt() -> Result<(), Error> {
    let module = bound("count n = if n == 0 then 0 else count (n - 1)\ncount 100000")?;
    let flag = Arc::new(AtomicBool::new(true));

    let Err(fault) = run(&module, Options::default(), &b""[..], std::io::sink(), std::io::sink(), Some(flag)) else {
        panic!("expected an interrupt");
    };
    assert_eq!(fault.kind, FaultKind::Interrupted);

    Ok(())
}

#[test]
fn test_live_nodes_return_to_zero() -> Result<(), Error> {
    let before = live_nodes();

    {
        let ran = execute("main input = puts (map (c -> c + 1) input)", b"abc")?;
        assert_eq!(ran.output, "bcd");

        assert_eq!(fault("head []")?, FaultKind::Abort);
        assert_eq!(value("xs = 1 : xs\nhead (3 tail xs) + length [1, 2]")?, "3");
    }

    assert_eq!(live_nodes(), before);

    Ok(())
}

#[test]
fn test_deep_sources_bind_and_run() -> Result<(), Error> {
    let before = live_nodes();

    {
        let list = format!("length ({}[])", "1 : ".repeat(50_000));
        assert_eq!(value(&list)?, "50000");

        let depth = 20_000;
        let nested = format!("{}0{}", "1 + (".repeat(depth), ")".repeat(depth));
        assert_eq!(value(&nested)?, "20000");
    }

    assert_eq!(live_nodes(), before);

    Ok(())
}

#[test]
fn test_deep_forcing_is_flat() -> Result<(), Error> {
    let before = live_nodes();

    {
        // both folds force 200000 nested non-tail calls
        let src = "upto n = if n == 0 then [] else n : upto (n - 1)\nsum (upto 200000) + length (map id (upto 200000))";
        assert_eq!(value(src)?, "20000300000");
    }

    assert_eq!(live_nodes(), before);

    Ok(())
}

#[test]
fn test_strings_are_bytes() -> Result<(), Error> {
    let written = |src: &str| -> Result<Vec<u8>, Error> {
        let module = bound(src)?;
        let mut output = vec![];
        let ran = run(&module, Options::default(), &b""[..], &mut output, std::io::sink(), None);
        assert!(ran.is_ok(), "`{src}` faulted");
        Ok(output)
    };

    assert_eq!(written("main _ = puts \"\\xff\"")?, [0xff]);
    assert_eq!(written("main _ = puts \"\\x00a\\x7f\"")?, [0x00, b'a', 0x7f]);
    // source characters keep their UTF-8 encoding
    assert_eq!(written("main _ = puts \"é\"")?, [0xc3, 0xa9]);

    assert_eq!(value("'\\xff'")?, "255");
    assert_eq!(value("head \"\\xff\"")?, "255");
    assert_eq!(value("length \"\\xffé\"")?, "3");

    Ok(())
}

#[test]
fn test_values_read_back_their_locals() -> Result<(), Error> {
    assert_eq!(value("(1, 2)")?, "(\\k -> (k 1 2))");
    assert_eq!(value("(x -> y -> x) 5")?, "(\\y -> 5)");

    // a local never demanded stays opaque, a demanded one shows its value
    assert_eq!(value("(1 + 1, 2)")?, "(\\k -> (k <thunk> 2))");
    assert_eq!(value("(x -> if x > 0 then (y -> x) else (y -> y)) (1 + 2)")?, "(\\y -> 3)");

    // a substituted closure reads back its own locals
    assert_eq!(value("(x -> if fst x > 0 then (y -> x) else (y -> y)) (1, 2)")?, "(\\y -> (\\k -> (k 1 2)))");

    Ok(())
}
