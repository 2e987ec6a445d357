use crate::{
    parser::prelude::{parse_module, Expr, ParseError, ParseErrorType},
    utils::prelude::SrcSpan,
};

fn printed(src: &str) -> Result<String, ParseError> {
    Ok(parse_module(src)?.to_string())
}

fn error(src: &str) -> ParseErrorType {
    match parse_module(src) {
        Ok(expr) => panic!("`{src}` parsed as {expr}"),
        Err(error) => error.error,
    }
}

#[test]
fn test_precedence() -> Result<(), ParseError> {
    assert_eq!(printed("1 + 2 * 3")?, "(1 + (2 * 3))");
    assert_eq!(printed("1 * 2 + 3")?, "((1 * 2) + 3)");
    assert_eq!(printed("2 ^ 3 ^ 2")?, "(2 ^ (3 ^ 2))");
    assert_eq!(printed("1 - 2 - 3")?, "((1 - 2) - 3)");
    assert_eq!(printed("f x y")?, "((f x) y)");
    assert_eq!(printed("f x + g y")?, "((f x) + (g y))");
    assert_eq!(printed("f . g $ x")?, "((f . g) $ x)");
    assert_eq!(printed("a || b && c == d")?, "(a || (b && (c == d)))");
    assert_eq!(printed("x : xs ++ ys")?, "(x : (xs ++ ys))");

    Ok(())
}

#[test]
fn test_non_associative() {
    assert_eq!(error("1 == 2 == 3"), ParseErrorType::NonAssociative {
        left: "==".into(),
        right: "==".into(),
    });
    assert!(matches!(error("a = b = c"), ParseErrorType::NonAssociative { .. }));
}

#[test]
fn test_missing_operand() {
    assert_eq!(error("1 +"), ParseErrorType::MissingOperand { operator: "+".into() });
    assert_eq!(error("* 2"), ParseErrorType::MissingOperand { operator: "*".into() });
    assert_eq!(error("[1, ]"), ParseErrorType::MissingOperand { operator: ",".into() });
}

#[test]
fn test_brackets() -> Result<(), ParseError> {
    assert_eq!(printed("(1 + 2) * 3")?, "((1 + 2) * 3)");
    assert_eq!(printed("()")?, "()");
    assert_eq!(printed("(1, f x, 3)")?, "(1, (f x), 3)");
    assert_eq!(printed("[]")?, "[]");
    assert_eq!(printed("[1, 2 + 3]")?, "[1, (2 + 3)]");
    assert_eq!(printed("{Nil, Cons h t}")?, "{Nil, ((Cons h) t)}");
    assert_eq!(printed("f (g x) [y]")?, "((f (g x)) [y])");

    Ok(())
}

#[test]
fn test_unbalanced_brackets() {
    assert_eq!(error("(1 + 2"), ParseErrorType::MissingClose { open: "(".into() });
    assert_eq!(error("1 + 2)"), ParseErrorType::MissingOpen { close: ")".into() });
    assert_eq!(error("[1, 2)"), ParseErrorType::MissingOpen { close: ")".into() });
    assert_eq!(error("([1, 2)"), ParseErrorType::MissingClose { open: "[".into() });
    assert_eq!(error("f (x"), ParseErrorType::MissingClose { open: "(".into() });
}

#[test]
fn test_stray_comma() {
    assert_eq!(error("1, 2"), ParseErrorType::StrayComma);
}

#[test]
fn test_sections() -> Result<(), ParseError> {
    assert_eq!(printed("(+)")?, "(+)");
    assert_eq!(printed("(+ 1)")?, "(+ 1)");
    assert_eq!(printed("(1 +)")?, "(1 +)");
    assert_eq!(printed("(- 1)")?, "(- 1)");
    assert_eq!(printed("map (* 2) xs")?, "((map (* 2)) xs)");
    assert_eq!(printed("(+ 1 * 2)")?, "(+ (1 * 2))");

    assert!(matches!(parse_module("(+ 1)")?, Expr::Section { .. }));
    assert!(matches!(parse_module("(+)")?, Expr::Name { .. }));

    assert_eq!(error("(+ 1 + 2)"), ParseErrorType::MissingOperand { operator: "+".into() });
    assert_eq!(error("(1 + 2 *)"), ParseErrorType::MissingOperand { operator: "*".into() });
    assert_eq!(error("[+ 1]"), ParseErrorType::MissingOperand { operator: "+".into() });

    Ok(())
}

#[test]
fn test_lambdas() -> Result<(), ParseError> {
    assert_eq!(printed("x -> x + 1")?, "(x -> (x + 1))");
    assert_eq!(printed("x y -> y")?, "((x y) -> y)");
    assert_eq!(printed("\\x -> x")?, "(x -> x)");
    assert_eq!(printed("λ x → x")?, "(x -> x)");
    assert_eq!(printed("map \\x -> x * 2")?, "(map (x -> (x * 2)))");
    assert_eq!(printed("f a \\x -> g \\y -> y")?, "((f a) (x -> (g (y -> y))))");
    assert_eq!(printed("xs@(h, t) -> h")?, "((xs@(h, t)) -> h)");

    Ok(())
}

#[test]
fn test_mixfix() -> Result<(), ParseError> {
    assert_eq!(printed("if c then a else b")?, "(if c then a else b)");
    assert_eq!(printed("if a < b then a + 1 else f b")?, "(if (a < b) then (a + 1) else (f b))");
    assert_eq!(
        printed("if x then if y then 1 else 2 else 3")?,
        "(if x then (if y then 1 else 2) else 3)",
    );
    assert_eq!(printed("f if c then a else b")?, "(f (if c then a else b))");

    let parsed = parse_module("if c then a else b")?;
    let Expr::Mixfix { parts, operands } = &parsed else {
        panic!("expected a mixfix chain");
    };
    assert_eq!(parts.len(), 3);
    assert_eq!(operands.len(), 3);

    Ok(())
}

#[test]
fn test_prior_mismatch() {
    assert_eq!(error("a else b"), ParseErrorType::PriorMismatch {
        operator: "else".into(),
        prior: "then".into(),
    });
    assert_eq!(error("(if c) then a"), ParseErrorType::PriorMismatch {
        operator: "then".into(),
        prior: "if".into(),
    });
}

#[test]
fn test_definitions() -> Result<(), ParseError> {
    assert_eq!(printed("f x = x + 1")?, "((f x) = (x + 1))");
    assert_eq!(printed("let x = 1")?, "(x = 1)");
    assert_eq!(printed("a && b = a b false")?, "((a && b) = ((a b) false))");
    // undeclared operators are plain operands
    assert_eq!(printed("a <+> b = a")?, "(((a (<+>)) b) = a)");
    assert_eq!(
        printed("if c then a else b = c a b")?,
        "((if c then a else b) = ((c a) b))",
    );

    Ok(())
}

#[test_log::test]
fn test_declarations() -> Result<(), ParseError> {
    assert_eq!(printed("infixl 60 <+>\n1 <+> 2 <+> 3")?, "(infixl 60 <+>; ((1 <+> 2) <+> 3))");
    assert_eq!(printed("infixr 60 <+>\n1 <+> 2 <+> 3")?, "(infixr 60 <+>; (1 <+> (2 <+> 3)))");
    assert_eq!(printed("infixl 70 div\n7 div 2 + 1")?, "(infixl 70 div; ((7 div 2) + 1))");
    assert_eq!(printed("prefix 85 !\n! x + 1")?, "(prefix 85 !; ((! x) + 1))");
    assert_eq!(printed("postfix 85 ?\nx ? * 2")?, "(postfix 85 ?; ((x ?) * 2))");
    assert_eq!(printed("bracket <| |>\n<| x |>")?, "(bracket <| |>; <| x |>)");

    let src = "prefix 3 when\ninfixr 3 do after when\nwhen c do x";
    assert_eq!(printed(src)?, "(prefix 3 when; infixr 3 do after when; (when c do x))");

    let src = "infixr 3 then' after if'\nprefix 3 if'\nif' c then' x";
    assert_eq!(printed(src)?, "(infixr 3 then' after if'; prefix 3 if'; (if' c then' x))");

    assert!(matches!(
        error("infixl 100 <+>"),
        ParseErrorType::InvalidDeclaration { .. }
    ));
    assert!(matches!(
        error("bracket <|"),
        ParseErrorType::InvalidDeclaration { .. }
    ));
    assert!(matches!(
        error("infixl <+>"),
        ParseErrorType::InvalidDeclaration { .. }
    ));

    Ok(())
}

#[test_log::test]
fn test_scoped_declarations() -> Result<(), ParseError> {
    assert_eq!(printed("(infixl 60 <+>; 1 <+> 2)")?, "(infixl 60 <+>; (1 <+> 2))");

    // outside the bracket `<+>` is an operand again
    assert_eq!(printed("(infixl 60 <+>; 1)\na <+> b")?, "((infixl 60 <+>; 1); ((a (<+>)) b))");

    // inner scopes may shadow outer rules
    assert_eq!(printed("(infixr 60 -; 1 - 2 - 3)")?, "(infixr 60 -; (1 - (2 - 3)))");
    assert_eq!(printed("(infixr 60 -; 1)\n1 - 2 - 3")?, "((infixr 60 -; 1); ((1 - 2) - 3))");

    Ok(())
}

#[test]
fn test_syntax_redefinition() {
    assert_eq!(
        error("infixl 60 <+>\ninfixr 50 <+>"),
        ParseErrorType::SyntaxRedefinition { symbol: "<+>".into() },
    );
    assert_eq!(error("infix 40 =="), ParseErrorType::SyntaxRedefinition { symbol: "==".into() });
}

#[test_log::test]
fn test_layout() -> Result<(), ParseError> {
    assert_eq!(printed("a\nb\nc")?, "(a; b; c)");
    assert_eq!(printed("\n\n  a\n  b\n")?, "(a; b)");
    assert_eq!(printed("f x =\n  x\n    + 1\ng = 2")?, "(((f x) = (x + 1)); (g = 2))");

    let src = "
main input =
  let x = 1
  let y = x + 1
  y
answer = 42
";
    assert_eq!(printed(src)?, "(((main input) = ((x = 1); (y = (x + 1)); y)); (answer = 42))");

    let src = "
f =
  g =
    1
  g
";
    assert_eq!(printed(src)?, "(f = ((g = 1); g))");

    // newlines inside explicit brackets are whitespace
    assert_eq!(printed("f (a\nb)\n[1,\n2]")?, "((f (a b)); [1, 2])");

    // trailing separators are dropped
    assert_eq!(printed("a;\nb;")?, "(a; b)");

    // an indented run groups tighter than the separator it hangs from
    assert_eq!(printed("f x =\n  a\n  b\nc")?, "(((f x) = (a; b)); c)");

    Ok(())
}

#[test]
fn test_layout_errors() {
    assert_eq!(error("f =\n   x"), ParseErrorType::OddIndentation { width: 3 });
    assert_eq!(
        error("f =\n    g =\n      x\n  y"),
        ParseErrorType::InconsistentIndentation { width: 2 },
    );
    assert!(matches!(error("f =\n\tx"), ParseErrorType::LexError { .. }));
}

#[test]
fn test_literals() -> Result<(), ParseError> {
    assert_eq!(printed("puts \"hi\\n\"")?, "(puts \"hi\\n\")");
    assert_eq!(printed("'a' : 'b' : []")?, "('a' : ('b' : []))");
    assert_eq!(printed("0x10 + 0b11")?, "(16 + 3)");
    assert_eq!(printed("puts \"\\xff\"")?, "(puts \"\\xff\")");
    assert_eq!(printed("puts \"é\"")?, "(puts \"\\xc3\\xa9\")");
    assert_eq!(printed("")?, "()");

    Ok(())
}

#[test]
fn test_round_trip() -> Result<(), ParseError> {
    let sources = [
        "1 + 2 * 3 - f x y",
        "f x = if x == 0 then 1 else x * f (x - 1)",
        "map (+ 1) [1, 2, 3]; (1 +); (+)",
        "T a = {Nil, Cons a (T a)}",
        "swap (a, b) = (b, a)\nmain _ = puts \"done\\n\"",
        "xs@(h, t) -> \\y -> h y",
        "infixl 60 <+>\nbracket <| |>\n<| 1 <+> 2 |>",
        "prefix 85 !\npostfix 90 ?\n! a ? + 1",
        "f =\n  let x = 'a'\n  x : []",
        "()",
    ];

    for src in sources {
        let once = printed(src)?;
        let twice = printed(&once)?;
        assert_eq!(once, twice, "printing `{src}` is not stable");
    }

    Ok(())
}

#[test]
fn test_error_spans() {
    let Err(error) = parse_module("1 +\n2 ==\n3 == 4") else {
        panic!("expected an error");
    };

    assert!(matches!(error.error, ParseErrorType::NonAssociative { .. }));
    assert_eq!(error.span.start, 6);
    assert_eq!(error.span.end, 13);
}

#[test]
fn test_long_chains() -> Result<(), ParseError> {
    let count = 50_000;
    let numbers = (0..count).map(|value| value.to_string()).collect::<Vec<_>>();

    let parsed = parse_module(&format!("[{}]", numbers.join(", ")))?;
    let Expr::List { items, .. } = &parsed else {
        panic!("expected a list");
    };
    assert_eq!(items.len(), count);
    assert!(matches!(items.first(), Some(Expr::Int { value: 0, .. })));
    assert!(matches!(items.last(), Some(Expr::Int { value, .. }) if *value == count as i64 - 1));

    let parsed = parse_module(&numbers.join("; "))?;
    let Expr::Sequence { items, .. } = &parsed else {
        panic!("expected a sequence");
    };
    assert_eq!(items.len(), count);
    assert!(matches!(items.get(1), Some(Expr::Int { value: 1, .. })));

    // a right-nested operator chain as deep as the list is long
    let src = format!("{}xs", "1 : ".repeat(count));
    let parsed = parse_module(&src)?;
    assert_eq!(parsed.location(), SrcSpan::from(0, src.len() as u32));
    assert!(parsed.mentions("xs"));
    assert!(!parsed.mentions("ys"));

    Ok(())
}
