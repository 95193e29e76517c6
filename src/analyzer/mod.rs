//! Parsing of token sequences into expression trees.

pub mod parser;

pub use parser::{ParseError, ParseResult, Parser, DEFAULT_MAX_DEPTH};

pub use crate::ast;
