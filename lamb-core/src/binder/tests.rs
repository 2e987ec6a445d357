use std::{path::PathBuf, rc::Rc};

use crate::{
    binder::{bind, prelude::{BindErrorType, BindWarning, Entry, Global, Module}},
    term::prelude::Origin,
    utils::prelude::{Error, NullWarningEmitterIO, VectorWarningEmitterIO, Warning},
};

fn bound(src: &str) -> Result<Module, Error> {
    bind(PathBuf::from("test.lamb"), src.into(), Rc::new(NullWarningEmitterIO))
}

fn failure(src: &str) -> BindErrorType {
    match bound(src) {
        Ok(_) => panic!("`{src}` bound without errors"),
        Err(Error::Bind { error, .. }) => error.error,
        Err(other) => panic!("`{src}` failed outside the binder: {other:?}"),
    }
}

fn warnings(src: &str) -> Result<Vec<BindWarning>, Error> {
    let emitter = VectorWarningEmitterIO::new();
    let _ = bind(PathBuf::from("test.lamb"), src.into(), Rc::new(emitter.clone()))?;

    Ok(emitter
        .take()
        .into_iter()
        .map(|warning| match warning {
            Warning::Bind { warning, .. } => warning,
        })
        .collect())
}

fn global<'m>(module: &'m Module, name: &str) -> &'m Global {
    module
        .globals
        .iter()
        .rev()
        .find(|global| global.tag.text() == name)
        .unwrap_or_else(|| panic!("`{name}` is not a global"))
}

#[test]
fn test_expression_entry() -> Result<(), Error> {
    let module = bound("double x = x * 2\ndouble 21")?;

    assert!(matches!(module.entry, Entry::Expression(_)));
    assert_eq!(module.entry.term().to_string(), "(double 21)");
    assert_eq!(global(&module, "double").term.to_string(), "(\\x -> ((*) x 2))");
    assert_eq!(global(&module, "double").tag.origin(), Origin::Module);
    assert_eq!(global(&module, "map").tag.origin(), Origin::Prelude);

    Ok(())
}

#[test]
fn test_main_entry() -> Result<(), Error> {
    let module = bound("main input = puts input")?;

    assert!(matches!(module.entry, Entry::Main(_)));
    assert_eq!(module.entry.term().to_string(), "(main (input_from 0))");

    // expressions win over `main`
    let module = bound("main input = puts input\n1 + 2")?;
    assert_eq!(module.entry.term().to_string(), "((+) 1 2)");

    assert_eq!(failure("f x = x"), BindErrorType::NothingToRun);

    Ok(())
}

#[test]
fn test_resolution() -> Result<(), Error> {
    // locals shadow builtins and globals
    let module = bound("f put map = put map\nf")?;
    assert_eq!(global(&module, "f").term.to_string(), "(\\put map -> (put map))");

    assert_eq!(failure("main _ = puts greeting"), BindErrorType::UndefinedSymbol { name: "greeting".into() });
    assert_eq!(failure("f x = _\nf"), BindErrorType::ReservedName { name: "_".into() });
    // globals are only visible after their definition
    assert_eq!(failure("f = g\ng = 1\nf"), BindErrorType::UndefinedSymbol { name: "g".into() });

    Ok(())
}

#[test]
fn test_redefinition() {
    assert!(matches!(
        failure("f x = x\nf y = y\nf"),
        BindErrorType::Redefinition { name, first: Some(first) } if name == "f" && first.start == 0
    ));
    assert_eq!(failure("put x = x\n1"), BindErrorType::Redefinition { name: "put".into(), first: None });
    assert!(matches!(
        failure("f x x = x\nf"),
        BindErrorType::Redefinition { name, .. } if name == "x"
    ));
    assert!(matches!(
        failure("f =\n  let a = 1\n  let a = 2\n  a\nf"),
        BindErrorType::Redefinition { name, .. } if name == "a"
    ));

    let Err(error) = bound("f x = x\nf y = y\nf") else {
        panic!("expected a redefinition");
    };
    let rendered = error.pretty_string();
    assert!(rendered.contains("First defined here"), "{rendered}");
    assert_eq!(error.exit_code(), 1);
}

#[test]
fn test_invalid_shapes() {
    assert_eq!(failure("1 = 2"), BindErrorType::InvalidLeftHandSide);
    assert_eq!(failure("f 1 = 2\nf"), BindErrorType::InvalidPattern);
    assert_eq!(failure("f = id {A, B}\nf"), BindErrorType::MisplacedData);
    assert_eq!(failure("f =\n  let a = 1\nf"), BindErrorType::MissingBody);
}

#[test]
#[test_log::test]
fn test_recursion() -> Result<(), Error> {
    let module = bound("count n = if n == 0 then 0 else count (n - 1)\ncount 3")?;
    let term = global(&module, "count").term.to_string();

    assert!(term.starts_with("((\\f -> "), "{term}");
    assert!(
        term.contains("(\\count n -> (if_then_else ((==) n 0) 0 (count ((-) n 1))))"),
        "{term}"
    );

    // without a self reference there is no fixed point
    let module = bound("inc n = n + 1\ninc 1")?;
    assert_eq!(global(&module, "inc").term.to_string(), "(\\n -> ((+) n 1))");

    Ok(())
}

#[test]
#[test_log::test]
fn test_data_types() -> Result<(), Error> {
    let module = bound("Shape = {Circle r, Rect w h}\n0")?;

    assert_eq!(global(&module, "Shape").term.to_string(), "(\\v h1 h2 -> (v h1 h2))");
    assert_eq!(global(&module, "Circle").term.to_string(), "(\\f1 h1 h2 -> (h1 f1))");
    assert_eq!(global(&module, "Rect").term.to_string(), "(\\f1 f2 h1 h2 -> (h2 f1 f2))");
    assert_eq!(
        global(&module, "case_Rect").term.to_string(),
        "(\\v handler otherwise -> (v (\\f1 -> otherwise) handler))"
    );

    assert_eq!(failure("T = {A, A}\n0"), BindErrorType::Redefinition {
        name: "A".into(),
        first: Some(crate::utils::prelude::SrcSpan::from(5, 6)),
    });
    assert_eq!(failure("T = {A, 1}\n0"), BindErrorType::InvalidPattern);

    Ok(())
}

#[test]
fn test_patterns() -> Result<(), Error> {
    let module = bound("second (_, b) = b\nsecond (1, 2)")?;
    let term = global(&module, "second").term.to_string();

    // the tuple argument is split by projections before the fields bind
    assert!(term.starts_with("(\\ tuple -> ((\\_ b -> b) "), "{term}");

    let module = bound("f () = 1\nf ()")?;
    assert_eq!(global(&module, "f").term.to_string(), "(\\ unit -> 1)");

    let _ = bound("f xs@(h, _) = h\nf (1, 2)")?;
    assert_eq!(failure("f (a, a) = a\nf"), BindErrorType::Redefinition {
        name: "a".into(),
        first: Some(crate::utils::prelude::SrcSpan::from(3, 4)),
    });

    Ok(())
}

#[test]
fn test_blocks() -> Result<(), Error> {
    let module = bound("f =\n  let a = 1\n  let (b, c) = (a, 2)\n  b + c\nf")?;
    let term = global(&module, "f").term.to_string();
    assert!(term.starts_with("((\\a -> "), "{term}");

    let module = bound("main _ =\n  put 65\n  put 10\n  0")?;
    assert_eq!(
        global(&module, "main").term.to_string(),
        "(\\_ -> (put 65 (put 10 0)))"
    );

    Ok(())
}

#[test]
#[test_log::test]
fn test_warnings() -> Result<(), Error> {
    let found = warnings("main _ =\n  let unused = 1\n  let _quiet = 2\n  0")?;
    assert_eq!(found.len(), 1);
    assert!(matches!(&found[0], BindWarning::UnusedBinding { name, .. } if name == "unused"));

    let found = warnings("map f xs = xs\nmap id 1")?;
    assert_eq!(found.len(), 1);
    assert!(matches!(&found[0], BindWarning::ShadowedPrelude { name, .. } if name == "map"));

    // the module's own redefinitions are still errors
    assert!(matches!(
        failure("map f xs = xs\nmap f xs = f\n0"),
        BindErrorType::Redefinition { name, .. } if name == "map"
    ));

    Ok(())
}
