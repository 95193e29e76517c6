use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use crate::{ast::Node, tokenizer::Token};

pub const DEFAULT_MAX_DEPTH: usize = 10;

lazy_static! {
    static ref VARIABLE_NAME: Regex = Regex::new(r"^[A-Za-z_][\w\-]*$").unwrap();
}

/// Builds a [`Node`] tree from a token sequence.
#[derive(Debug, Clone)]
pub struct Parser {
    max_depth: usize,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl Parser {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    #[tracing::instrument(level = "trace", skip(self, tokens))]
    pub fn parse(&self, tokens: &[Token]) -> ParseResult<Vec<Node>> {
        self.parse_at(tokens, 0)
    }

    fn parse_at(&self, tokens: &[Token], depth: usize) -> ParseResult<Vec<Node>> {
        if depth > self.max_depth {
            return Err(ParseError::DepthExceeded {
                max_depth: self.max_depth,
            });
        }
        check_balance(tokens)?;

        let mut tree = Vec::new();
        let mut last: Option<&Token> = None;
        // tree.last() is the literal of a bare identifier (not a deref remainder)
        let mut bare_literal = false;
        let mut i = 0;

        while i < tokens.len() {
            let token = &tokens[i];
            let mut pushed_bare = false;

            match token {
                Token::LBracket => {
                    if last != Some(&Token::Action) {
                        return Err(ParseError::UnescapedBracket);
                    }
                    let close = i + 1 + find_closing(&tokens[i + 1..])?;
                    let subtree = self.parse_at(&tokens[i + 1..close], depth + 1)?;
                    if subtree.is_empty() {
                        return Err(ParseError::EmptySubexpression);
                    }
                    tree.push(Node::Subtree(subtree));
                    i = close;
                }
                Token::Assign => {
                    let name = match (last, tree.last()) {
                        (Some(Token::Identifier(_)), Some(Node::Literal(text))) if bare_literal => {
                            text.trim().to_string()
                        }
                        _ => {
                            return Err(ParseError::InvalidVariableName {
                                name: last.map(|t| t.to_string()).unwrap_or_default(),
                            })
                        }
                    };
                    if !VARIABLE_NAME.is_match(&name) {
                        return Err(ParseError::InvalidVariableName { name });
                    }
                    tree.pop();

                    let start = i + 1;
                    let end = find_terminator(&tokens[start..])
                        .map(|offset| start + offset)
                        .ok_or_else(|| ParseError::UnterminatedAssign { name: name.clone() })?;
                    let mut value = self.parse_at(&tokens[start..end], depth + 1)?;
                    if let [Node::Subtree(_)] = value.as_slice() {
                        if let Some(Node::Subtree(children)) = value.pop() {
                            value = children;
                        }
                    }
                    if value.is_empty() {
                        return Err(ParseError::EmptySubexpression);
                    }
                    tree.push(Node::VariableAssign { name, value });
                    i = end;
                }
                Token::Identifier(text) if last == Some(&Token::Action) => match text.split_once(' ')
                {
                    Some((name, rest)) => {
                        tree.push(Node::deref(name.trim()));
                        tree.push(Node::Literal(format!(" {}", rest)));
                    }
                    None => tree.push(Node::deref(text.trim())),
                },
                Token::Identifier(text) => {
                    tree.push(Node::Literal(text.clone()));
                    pushed_bare = true;
                }
                Token::Suppress => tree.push(Node::Suppress),
                Token::Action => {}
                Token::RBracket => {
                    return Err(ParseError::MalformedToken {
                        token: token.to_string(),
                    })
                }
            }

            bare_literal = pushed_bare;
            last = Some(&tokens[i]);
            i += 1;
        }

        Ok(tree)
    }
}

fn check_balance(tokens: &[Token]) -> ParseResult<()> {
    let opening = tokens.iter().filter(|t| **t == Token::LBracket).count();
    let closing = tokens.iter().filter(|t| **t == Token::RBracket).count();
    if opening != closing {
        return Err(ParseError::UnbalancedBracket { opening, closing });
    }
    Ok(())
}

/// Index of the bracket closing an already consumed `LBracket`.
fn find_closing(tokens: &[Token]) -> ParseResult<usize> {
    let mut open = 1usize;
    for (index, token) in tokens.iter().enumerate() {
        match token {
            Token::LBracket => open += 1,
            Token::RBracket => {
                open -= 1;
                if open == 0 {
                    return Ok(index);
                }
            }
            _ => {}
        }
    }
    Err(ParseError::UnbalancedBracket {
        opening: tokens.iter().filter(|t| **t == Token::LBracket).count() + 1,
        closing: tokens.iter().filter(|t| **t == Token::RBracket).count(),
    })
}

/// Index of the first `Suppress` outside any bracket pair.
fn find_terminator(tokens: &[Token]) -> Option<usize> {
    let mut open = 0usize;
    for (index, token) in tokens.iter().enumerate() {
        match token {
            Token::LBracket => open += 1,
            Token::RBracket => open = open.saturating_sub(1),
            Token::Suppress if open == 0 => return Some(index),
            _ => {}
        }
    }
    None
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Too deep. Cannot exceed {max_depth} nested commands.")]
    DepthExceeded { max_depth: usize },

    #[error("Unbalanced brackets: {opening} opening, {closing} closing")]
    UnbalancedBracket { opening: usize, closing: usize },

    #[error("Unescaped bracket. Brackets must follow an action character.")]
    UnescapedBracket,

    #[error("Subexpression evaluates to nothing")]
    EmptySubexpression,

    #[error("Invalid variable name \"{name}\"")]
    InvalidVariableName { name: String },

    #[error("Assignment to \"{name}\" is not terminated")]
    UnterminatedAssign { name: String },

    #[error("Unexpected {token}")]
    MalformedToken { token: String },
}

pub type ParseResult<T> = Result<T, ParseError>;
