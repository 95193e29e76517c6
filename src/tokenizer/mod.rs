//! Lexing of expression text.
//!
//! ```text
//! "x = $(!echo foo); $x"
//!   -> [Identifier("x "), Assign, Action, LBracket, Identifier("!echo foo"),
//!       RBracket, Suppress, Action, Identifier("x")]
//! ```

pub mod lexer;
pub mod token;

pub use lexer::{LexError, LexResult, Lexer};
pub use token::{Syntax, Token};
