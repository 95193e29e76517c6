use thiserror::Error;

use crate::analyzer::ParseError;
use crate::bot::{BotError, CommandError};
use crate::eval::EvalError;
use crate::event::EventError;
use crate::tokenizer::LexError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Event error: {0}")]
    Event(#[from] EventError),
    #[error("Lex error: {0}")]
    Lex(#[from] LexError),
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("Eval error: {0}")]
    Eval(#[from] EvalError),
    #[error("Command error: {0}")]
    Command(#[from] CommandError),
    #[error("Bot error: {0}")]
    Bot(#[from] BotError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type InternalResult<T> = Result<T, Error>;

impl Error {
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Error::Internal(message.into())
    }
}
