//! Runtime implementation for `lalrgen` parser generator.

pub mod definition;
pub mod parser;
