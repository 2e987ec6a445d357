use super::prelude::{live_nodes, Builtin, Kind, Tag, Term};

#[test]
fn test_live_nodes_balance() {
    let before = live_nodes();

    {
        let x = Tag::synthetic("x");
        let identity = Term::lambda(x.clone(), Term::local(0, x));
        let applied = Term::apply(identity.clone(), Term::int(5));

        assert_eq!(live_nodes() - before, 4);
        assert!(matches!(applied.kind(), Kind::Apply(..)));
    }

    assert_eq!(live_nodes(), before);
}

#[test]
fn test_long_spine_drops_iteratively() {
    let before = live_nodes();

    let mut list = Term::int(0);
    for value in 0..200_000 {
        list = Term::apply(Term::int(value), list);
    }
    drop(list);

    assert_eq!(live_nodes(), before);
}

#[test]
fn test_shared_children_survive() {
    let before = live_nodes();
    let shared = Term::int(7);

    {
        let _pair = Term::apply(shared.clone(), shared.clone());
    }

    assert!(matches!(shared.kind(), Kind::Int(7)));
    assert_eq!(live_nodes() - before, 1);
}

#[test]
fn test_display() {
    let f = Tag::synthetic("f");
    let x = Tag::synthetic("x");
    let term = Term::lambda(
        f.clone(),
        Term::lambda(
            x.clone(),
            Term::apply_all(
                Term::builtin(Builtin::Add, Tag::synthetic("+")),
                [Term::local(1, f), Term::local(0, x)],
            ),
        ),
    );

    assert_eq!(term.to_string(), "(\\f x -> ((+) f x))");
}

#[test]
fn test_builtin_table() {
    for builtin in Builtin::ALL {
        assert_eq!(Builtin::from_name(builtin.name()), Some(builtin));
    }

    assert_eq!(Builtin::from_name("main"), None);
    assert!(!Builtin::Abort.is_strict());
    assert_eq!(Builtin::Put.arity(), 1);
}
