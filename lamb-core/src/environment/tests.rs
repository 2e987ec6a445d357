use crate::term::prelude::{live_nodes, Origin, Tag, Term};
use super::prelude::{Backtrace, Closure, Env, State, BACKTRACE_LIMIT};

#[test]
fn test_env_lookup_by_depth() {
    let first = Closure::thunk(Term::int(1), Env::new(), Backtrace::new());
    let second = Closure::thunk(Term::int(2), Env::new(), Backtrace::new());

    let env = Env::new().push(first.clone()).push(second.clone());

    assert!(std::rc::Rc::ptr_eq(env.get(0).unwrap(), &second));
    assert!(std::rc::Rc::ptr_eq(env.get(1).unwrap(), &first));
    assert!(env.get(2).is_none());
}

#[test]
fn test_closure_states() {
    let x = Tag::synthetic("x");
    let value = Closure::new(Term::lambda(x.clone(), Term::local(0, x)), Env::new(), Backtrace::new());
    let pending = Closure::new(Term::apply(Term::int(1), Term::int(2)), Env::new(), Backtrace::new());

    assert_eq!(value.state, State::Done);
    assert_eq!(pending.state, State::Pending);
}

#[test]
fn test_long_chains_release_iteratively() {
    let before = live_nodes();

    let mut env = Env::new();
    for value in 0..200_000 {
        // every closure captures the whole chain built so far
        env = env.push(Closure::thunk(Term::int(value), env.clone(), Backtrace::new()));
    }
    drop(env);

    assert_eq!(live_nodes(), before);
}

#[test]
fn test_backtrace_is_bounded() {
    let mut backtrace = Backtrace::new();
    for index in 0..BACKTRACE_LIMIT + 4 {
        backtrace = backtrace.push(Tag::with_origin(format!("g{index}"), Default::default(), Origin::Prelude));
    }

    assert_eq!(backtrace.len(), BACKTRACE_LIMIT);
    assert_eq!(backtrace.names()[0], format!("g{}", BACKTRACE_LIMIT + 3));
    assert!(backtrace.module_tag().is_none());

    let backtrace = backtrace.push(Tag::new("main", Default::default()));
    assert_eq!(backtrace.module_tag().map(|tag| tag.text()), Some("main"));
}
