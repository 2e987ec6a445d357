pub mod builtin;
pub mod tag;
pub mod term;

pub mod prelude {
    pub use super::{
        builtin::*,
        tag::*,
        term::*
    };
}

#[cfg(test)]
mod tests;
