pub mod error;
pub mod ast;
pub mod registry;
pub mod reduce;
pub mod parser;

pub mod prelude {
    pub use super::{
        error::*,
        ast::*,
        registry::*,
        reduce::*,
        parser::*
    };
}

#[cfg(test)]
mod tests;
