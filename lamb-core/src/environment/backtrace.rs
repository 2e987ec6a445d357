use std::{collections::VecDeque, rc::Rc};

use crate::term::prelude::{Origin, Tag};

/// Most recent global references kept per closure.
pub const BACKTRACE_LIMIT: usize = 16;

/// The global references that led to a closure, newest last.
///
/// Closures share their backtrace with the code that created them, so a
/// push copies at most [`BACKTRACE_LIMIT`] tags and leaves the original
/// untouched.
#[derive(Debug, Default, Clone)]
pub struct Backtrace(Rc<VecDeque<Tag>>);

impl Backtrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, tag: Tag) -> Self {
        let mut entries = VecDeque::clone(&self.0);
        if entries.len() == BACKTRACE_LIMIT {
            let _ = entries.pop_front();
        }
        entries.push_back(tag);

        Self(Rc::new(entries))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Newest first.
    pub fn names(&self) -> Vec<String> {
        self.0.iter().rev().map(|tag| tag.text().to_string()).collect()
    }

    /// Newest reference written in the module itself.
    pub fn module_tag(&self) -> Option<&Tag> {
        self.0.iter().rev().find(|tag| tag.origin() == Origin::Module)
    }
}
