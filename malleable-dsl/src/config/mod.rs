//! Parser configuration

mod options;

pub use options::*;
