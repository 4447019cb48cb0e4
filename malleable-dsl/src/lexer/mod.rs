//! Lexer module for the profile language

pub mod token;
pub mod scanner;

pub use token::*;
pub use scanner::*;
