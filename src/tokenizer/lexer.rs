use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use super::token::{Syntax, Token};

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Splits expression text into [`Token`]s.
///
/// Runs of whitespace collapse to one space before scanning. Text between
/// structural characters is kept verbatim, so literals carry their spacing.
/// A trailing escape character with nothing after it is dropped.
#[derive(Debug, Clone, Default)]
pub struct Lexer {
    syntax: Syntax,
}

impl Lexer {
    pub fn new(syntax: Syntax) -> Self {
        Self { syntax }
    }

    pub fn syntax(&self) -> &Syntax {
        &self.syntax
    }

    #[tracing::instrument(level = "trace", skip(self))]
    pub fn lex(&self, text: &str) -> LexResult<Vec<Token>> {
        if !self.syntax.is_consistent() {
            return Err(LexError::AmbiguousSyntax {
                chars: self.syntax.chars().iter().collect(),
            });
        }

        let text = WHITESPACE.replace_all(text, " ");
        let mut tokens = Vec::new();
        let mut buffer = String::new();
        let mut escaping = false;

        for c in text.chars() {
            if std::mem::take(&mut escaping) {
                buffer.push(c);
                continue;
            }
            if c == self.syntax.escape {
                escaping = true;
                continue;
            }
            match self.syntax.structural(c) {
                Some(token) => {
                    // `$(a)$(b)` still needs a separator literal between the calls
                    let follows_bracket =
                        token == Token::Action && tokens.last() == Some(&Token::RBracket);
                    if !buffer.trim().is_empty() || follows_bracket {
                        tokens.push(Token::Identifier(std::mem::take(&mut buffer)));
                    }
                    buffer.clear();
                    tokens.push(token);
                }
                None => buffer.push(c),
            }
        }

        if !buffer.trim().is_empty() {
            tokens.push(Token::Identifier(buffer));
        }
        Ok(tokens)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexError {
    #[error("Structural characters must be distinct and non-whitespace, got {chars:?}")]
    AmbiguousSyntax { chars: String },
}

pub type LexResult<T> = Result<T, LexError>;
