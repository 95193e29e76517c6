//! Expression tree produced by the [`Parser`](crate::analyzer::Parser).
//!
//! ```text
//! "x = !echo foo; !echo $x"
//!   -> [VariableAssign { name: "x", value: [Literal(" !echo foo")] },
//!       Literal(" !echo "), VariableDeref("x")]
//! ```

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Text copied into the command being built, spacing preserved.
    Literal(String),
    /// `$( ... )`: evaluated in its own scope, result spliced in place.
    Subtree(Vec<Node>),
    /// `name = ... ;`
    VariableAssign { name: String, value: Vec<Node> },
    /// `$name`
    VariableDeref(String),
    /// `;`: runs the command built so far and discards its reply.
    Suppress,
}

impl Node {
    pub fn literal(text: &str) -> Self {
        Node::Literal(text.to_string())
    }

    pub fn deref(name: &str) -> Self {
        Node::VariableDeref(name.to_string())
    }

    pub fn assign(name: &str, value: Vec<Node>) -> Self {
        Node::VariableAssign {
            name: name.to_string(),
            value,
        }
    }

    /// Nesting depth of the deepest subtree; a flat node has depth 0.
    pub fn depth(&self) -> usize {
        match self {
            Node::Subtree(children) | Node::VariableAssign { value: children, .. } => {
                1 + children.iter().map(Node::depth).max().unwrap_or(0)
            }
            _ => 0,
        }
    }
}
