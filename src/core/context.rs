//! Run context - variables and runtime metadata shared across steps

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Execution context for a provisioning run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunContext {
    /// Resolved plan variables plus CLI overrides
    pub variables: HashMap<String, String>,

    /// The step currently being executed (if any)
    pub current_step_id: Option<String>,

    /// Metadata about the run
    pub metadata: HashMap<String, String>,
}

impl RunContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self {
            variables: HashMap::new(),
            current_step_id: None,
            metadata: HashMap::new(),
        }
    }

    /// Set a variable
    pub fn set_variable(&mut self, key: String, value: String) {
        self.variables.insert(key, value);
    }

    /// Get a variable
    pub fn get_variable(&self, key: &str) -> Option<&String> {
        self.variables.get(key)
    }

    /// Get all variables available for placeholder rendering
    pub fn rendering_variables(&self) -> HashMap<String, String> {
        let mut vars = self.variables.clone();

        if let Some(ref current_step) = self.current_step_id {
            vars.insert("current_step".to_string(), current_step.clone());
        }

        vars
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}
