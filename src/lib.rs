//! A tree-walking interpreter for a small dynamically typed scripting
//! language: `scan` turns source into tokens, `parse` turns tokens into
//! statements, and an [`interpreter::Interpreter`] runs them.

mod callable;
mod environment;
pub mod error;
pub mod expr;
pub mod interpreter;
pub mod parser;
pub mod printer;
pub mod scanner;
pub mod stmt;
pub mod token;
pub mod value;

pub use crate::{
    error::{Error, Result},
    interpreter::Interpreter,
    parser::parse,
    scanner::scan,
};
