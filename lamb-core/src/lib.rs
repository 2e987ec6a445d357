pub mod term;
pub mod lexer;
pub mod parser;
pub mod binder;
pub mod environment;
pub mod eval;
pub mod utils;
