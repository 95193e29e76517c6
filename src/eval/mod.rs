//! Evaluation of chat expressions.
//!
//! See [`evaluator`] for how commands become event round trips.

pub mod context;
pub mod evaluator;

use thiserror::Error;

use crate::{analyzer::ParseError, event::EventError, tokenizer::LexError};

pub use context::Scope;
pub use evaluator::Evaluator;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Cannot dereference variable \"{name}\" before it is assigned.")]
    UnboundVariable { name: String },

    #[error("Ran out of time on command \"{command}\".")]
    Timeout { command: String },

    #[error("\"{command}\" failed: {message}")]
    CommandFailed { command: String, message: String },

    #[error("Reply channel for \"{command}\" closed before an answer arrived")]
    ReplyLost { command: String },

    #[error("Event error: {0}")]
    Event(#[from] EventError),
}

pub type EvalResult<T> = Result<T, EvalError>;
