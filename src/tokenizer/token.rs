use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Raw text between structural characters, whitespace preserved.
    Identifier(String),
    LBracket,
    RBracket,
    Action,
    Assign,
    Suppress,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Identifier(text) => write!(f, "identifier({:?})", text),
            Token::LBracket => write!(f, "left bracket"),
            Token::RBracket => write!(f, "right bracket"),
            Token::Action => write!(f, "action"),
            Token::Assign => write!(f, "assign"),
            Token::Suppress => write!(f, "suppress"),
        }
    }
}

/// The six characters with structural meaning in an expression.
///
/// Defaults: `;` suppress, `(` `)` brackets, `$` action, `=` assign and `\`
/// escape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Syntax {
    #[serde(default = "default_suppress")]
    pub suppress: char,
    #[serde(default = "default_left_bracket")]
    pub left_bracket: char,
    #[serde(default = "default_right_bracket")]
    pub right_bracket: char,
    #[serde(default = "default_action")]
    pub action: char,
    #[serde(default = "default_assign")]
    pub assign: char,
    #[serde(default = "default_escape")]
    pub escape: char,
}

fn default_suppress() -> char {
    ';'
}

fn default_left_bracket() -> char {
    '('
}

fn default_right_bracket() -> char {
    ')'
}

fn default_action() -> char {
    '$'
}

fn default_assign() -> char {
    '='
}

fn default_escape() -> char {
    '\\'
}

impl Default for Syntax {
    fn default() -> Self {
        Self {
            suppress: default_suppress(),
            left_bracket: default_left_bracket(),
            right_bracket: default_right_bracket(),
            action: default_action(),
            assign: default_assign(),
            escape: default_escape(),
        }
    }
}

impl Syntax {
    /// Token produced by an unescaped `c`, or `None` for ordinary text.
    pub fn structural(&self, c: char) -> Option<Token> {
        if c == self.suppress {
            Some(Token::Suppress)
        } else if c == self.left_bracket {
            Some(Token::LBracket)
        } else if c == self.right_bracket {
            Some(Token::RBracket)
        } else if c == self.action {
            Some(Token::Action)
        } else if c == self.assign {
            Some(Token::Assign)
        } else {
            None
        }
    }

    pub(crate) fn chars(&self) -> [char; 6] {
        [
            self.suppress,
            self.left_bracket,
            self.right_bracket,
            self.action,
            self.assign,
            self.escape,
        ]
    }

    /// Every structural character must be distinct and non-whitespace.
    pub fn is_consistent(&self) -> bool {
        let chars = self.chars();
        chars.iter().enumerate().all(|(i, c)| {
            !c.is_whitespace() && chars.iter().skip(i + 1).all(|other| other != c)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_syntax() {
        let syntax = Syntax::default();
        assert_eq!(syntax.structural('$'), Some(Token::Action));
        assert_eq!(syntax.structural('('), Some(Token::LBracket));
        assert_eq!(syntax.structural(';'), Some(Token::Suppress));
        assert_eq!(syntax.structural('\\'), None);
        assert_eq!(syntax.structural('a'), None);
        assert!(syntax.is_consistent());
    }

    #[test]
    fn test_inconsistent_syntax() {
        let syntax = Syntax {
            assign: '$',
            ..Default::default()
        };
        assert!(!syntax.is_consistent());

        let syntax = Syntax {
            escape: ' ',
            ..Default::default()
        };
        assert!(!syntax.is_consistent());
    }

    #[test]
    fn test_partial_syntax_from_json() {
        let syntax: Syntax = serde_json::from_str(r#"{"action": "@"}"#).unwrap();
        assert_eq!(syntax.action, '@');
        assert_eq!(syntax.suppress, ';');
    }
}
