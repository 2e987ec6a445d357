pub mod closure;
pub mod backtrace;
pub mod value;

pub mod prelude {
    pub use super::{
        backtrace::*,
        closure::*,
        value::*
    };
}

#[cfg(test)]
mod tests;
