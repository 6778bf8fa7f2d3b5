//! Provisioning plan configuration from YAML

use crate::core::step::{placeholder_names, Action, AptOp};
use crate::core::Plan;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Variable definition - a literal string or an environment lookup
///
/// Ambient environment variables (`BASE_USER` and friends) are declared
/// here explicitly instead of being read ad hoc by the steps that need them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableConfig {
    /// Simple string value
    Literal(String),
    /// Value taken from the process environment, with an optional default
    Env {
        env: String,
        #[serde(default)]
        default: Option<String>,
    },
}

impl VariableConfig {
    /// Resolve the variable to a concrete string
    pub fn resolve(&self, name: &str) -> Result<String> {
        match self {
            VariableConfig::Literal(value) => Ok(value.clone()),
            VariableConfig::Env { env, default } => match std::env::var(env) {
                Ok(value) => Ok(value),
                Err(_) => default.clone().ok_or_else(|| {
                    anyhow!(
                        "variable '{}': environment variable {} is not set and has no default",
                        name,
                        env
                    )
                }),
            },
        }
    }
}

/// Top-level provisioning plan loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanConfig {
    /// Plan name
    pub name: String,

    /// Plan version (optional)
    #[serde(default)]
    pub version: Option<String>,

    /// Variables available to all steps
    #[serde(default)]
    pub variables: HashMap<String, VariableConfig>,

    /// Ordered provisioning steps
    pub steps: Vec<StepConfig>,

    /// Commands run best-effort when a step fails, before the non-zero exit
    #[serde(default)]
    pub cleanup: Vec<CleanupConfig>,

    /// Default timeout for steps (in seconds)
    #[serde(default)]
    pub default_timeout_secs: Option<u64>,
}

/// Step configuration as defined in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    /// Unique step identifier
    pub id: String,

    /// Human-readable step name
    pub name: String,

    /// The action to perform, discriminated by the `action` field
    #[serde(flatten)]
    pub action: Action,

    /// Override the per-action idempotence default
    #[serde(default)]
    pub idempotent: Option<bool>,

    /// Timeout for this step (overrides the plan default)
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// A cleanup command (fail-fast runs exactly one cleanup pass on failure)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl PlanConfig {
    /// Load a plan configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse a plan configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: PlanConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the plan configuration
    pub fn validate(&self) -> Result<()> {
        // Step IDs must be unique
        let mut seen_ids = std::collections::HashSet::new();
        for step in &self.steps {
            if !seen_ids.insert(&step.id) {
                anyhow::bail!("Duplicate step ID: {}", step.id);
            }
        }

        for step in &self.steps {
            if let Action::Apt { op, packages } = &step.action {
                match op {
                    AptOp::Install | AptOp::Purge if packages.is_empty() => {
                        anyhow::bail!(
                            "Step '{}': apt {:?} requires a non-empty package list",
                            step.id,
                            op
                        );
                    }
                    AptOp::Update | AptOp::Upgrade if !packages.is_empty() => {
                        anyhow::bail!(
                            "Step '{}': apt {:?} takes no package list",
                            step.id,
                            op
                        );
                    }
                    _ => {}
                }
            }

            // Every placeholder must reference a declared variable
            for field in step.action.template_fields() {
                for name in placeholder_names(field)? {
                    if !self.variables.contains_key(&name) {
                        anyhow::bail!(
                            "Step '{}' references undeclared variable '{}'",
                            step.id,
                            name
                        );
                    }
                }
            }
        }

        for cleanup in &self.cleanup {
            let mut fields = vec![cleanup.command.as_str()];
            fields.extend(cleanup.args.iter().map(|a| a.as_str()));
            for field in fields {
                for name in placeholder_names(field)? {
                    if !self.variables.contains_key(&name) {
                        anyhow::bail!("Cleanup references undeclared variable '{}'", name);
                    }
                }
            }
        }

        Ok(())
    }

    /// Resolve all variables to concrete strings
    pub fn resolve_variables(&self) -> Result<HashMap<String, String>> {
        self.variables
            .iter()
            .map(|(name, def)| Ok((name.clone(), def.resolve(name)?)))
            .collect()
    }

    /// Convert the config into a Plan domain model
    pub fn to_plan(&self) -> Result<Plan> {
        Plan::from_config(self)
    }
}
