use std::collections::HashMap;
use std::sync::Arc;

use super::EvalError;

/// Variable bindings visible to one level of an expression.
///
/// Children see a snapshot of their parent taken when they were created.
/// Bindings made in a child never reach the parent.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    variables: HashMap<String, String>,
    parent: Option<Arc<Scope>>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parent(parent: Arc<Scope>) -> Self {
        Self {
            variables: HashMap::new(),
            parent: Some(parent),
        }
    }

    /// Child scope for a subexpression or assignment value.
    pub fn child(&self) -> Self {
        Self::with_parent(Arc::new(self.clone()))
    }

    pub fn lookup(&self, name: &str) -> Result<&str, EvalError> {
        // 現在のスコープで検索
        if let Some(value) = self.variables.get(name) {
            return Ok(value);
        }

        if let Some(parent) = &self.parent {
            return parent.lookup(name);
        }

        Err(EvalError::UnboundVariable {
            name: name.to_string(),
        })
    }

    pub fn insert(&mut self, name: String, value: String) -> Option<String> {
        self.variables.insert(name, value)
    }
}
