//! Human-readable account of why an engine produced a result.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Explanation {
    pub component: String,
    pub reasoning: String,
    pub details: BTreeMap<String, String>,
}

impl Explanation {
    pub fn new(component: impl Into<String>, reasoning: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            reasoning: reasoning.into(),
            details: BTreeMap::new(),
        }
    }

    /// Builder-style detail entry.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.details.insert(key.into(), value.to_string());
        self
    }
}
