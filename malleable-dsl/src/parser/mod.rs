//! Parser module for the profile language

pub mod ast;
pub mod parser;

pub use ast::*;
pub use parser::*;
