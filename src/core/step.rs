//! Step domain model

use crate::core::state::StepState;
use anyhow::{bail, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Pattern matched by `{{ variable }}` placeholders in step fields
const PLACEHOLDER_PATTERN: &str = r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}";

/// A single step in a provisioning plan
#[derive(Debug, Clone)]
pub struct Step {
    /// Unique step identifier
    pub id: String,

    /// Human-readable step name
    pub name: String,

    /// The action this step performs
    pub action: Action,

    /// Whether re-applying this step to an already-provisioned image is safe
    pub idempotent: bool,

    /// Timeout in seconds
    pub timeout_secs: u64,

    /// Runtime state (not serialized)
    pub state: StepState,
}

/// An apt-get operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AptOp {
    /// Remove packages together with their configuration
    Purge,
    /// Refresh the package index
    Update,
    /// Upgrade all installed packages
    Upgrade,
    /// Install packages
    Install,
}

/// The action a step performs
///
/// String fields may contain `{{ variable }}` placeholders which are
/// substituted from the plan variables at execution time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Action {
    /// Copy a directory tree onto a destination path, overwriting
    /// unconditionally, optionally re-owning the result
    UnpackOverlay {
        source: String,
        dest: String,
        #[serde(default)]
        owner: Option<String>,
    },

    /// Run a single apt-get operation
    Apt {
        op: AptOp,
        #[serde(default)]
        packages: Vec<String>,
    },

    /// Install Python dependencies from a requirements manifest
    PipInstall {
        requirements: String,
        /// pip executable override (defaults to `pip3`)
        #[serde(default)]
        python: Option<String>,
    },

    /// Move a unit file into the service directory, chmod it to 0644,
    /// and enable it via the service manager
    InstallService {
        unit: String,
        #[serde(default)]
        service_dir: Option<String>,
        #[serde(default = "default_enable")]
        enable: bool,
    },

    /// Invoke an arbitrary program (escape hatch, also used by cleanup)
    Run {
        command: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

fn default_enable() -> bool {
    true
}

impl Action {
    /// Short label for logs and plan previews
    pub fn kind(&self) -> &'static str {
        match self {
            Action::UnpackOverlay { .. } => "unpack-overlay",
            Action::Apt { .. } => "apt",
            Action::PipInstall { .. } => "pip-install",
            Action::InstallService { .. } => "install-service",
            Action::Run { .. } => "run",
        }
    }

    /// Whether this action is safe to re-apply by default
    ///
    /// `apt purge` is destructive and `run` is opaque; everything else is a
    /// no-op or an unconditional overwrite when repeated.
    pub fn default_idempotent(&self) -> bool {
        match self {
            Action::Apt { op: AptOp::Purge, .. } => false,
            Action::Run { .. } => false,
            _ => true,
        }
    }

    /// All string fields that may contain `{{ variable }}` placeholders
    pub fn template_fields(&self) -> Vec<&str> {
        match self {
            Action::UnpackOverlay { source, dest, owner } => {
                let mut fields = vec![source.as_str(), dest.as_str()];
                if let Some(owner) = owner {
                    fields.push(owner.as_str());
                }
                fields
            }
            Action::Apt { packages, .. } => packages.iter().map(|p| p.as_str()).collect(),
            Action::PipInstall { requirements, python } => {
                let mut fields = vec![requirements.as_str()];
                if let Some(python) = python {
                    fields.push(python.as_str());
                }
                fields
            }
            Action::InstallService {
                unit, service_dir, ..
            } => {
                let mut fields = vec![unit.as_str()];
                if let Some(dir) = service_dir {
                    fields.push(dir.as_str());
                }
                fields
            }
            Action::Run { command, args } => {
                let mut fields = vec![command.as_str()];
                fields.extend(args.iter().map(|a| a.as_str()));
                fields
            }
        }
    }

    /// Substitute `{{ variable }}` placeholders in all string fields
    ///
    /// Fails if any placeholder has no matching variable.
    pub fn render(&self, variables: &HashMap<String, String>) -> Result<Action> {
        let rendered = match self {
            Action::UnpackOverlay { source, dest, owner } => Action::UnpackOverlay {
                source: render_template(source, variables)?,
                dest: render_template(dest, variables)?,
                owner: owner
                    .as_ref()
                    .map(|o| render_template(o, variables))
                    .transpose()?,
            },
            Action::Apt { op, packages } => Action::Apt {
                op: *op,
                packages: packages
                    .iter()
                    .map(|p| render_template(p, variables))
                    .collect::<Result<Vec<_>>>()?,
            },
            Action::PipInstall {
                requirements,
                python,
            } => Action::PipInstall {
                requirements: render_template(requirements, variables)?,
                python: python
                    .as_ref()
                    .map(|p| render_template(p, variables))
                    .transpose()?,
            },
            Action::InstallService {
                unit,
                service_dir,
                enable,
            } => Action::InstallService {
                unit: render_template(unit, variables)?,
                service_dir: service_dir
                    .as_ref()
                    .map(|d| render_template(d, variables))
                    .transpose()?,
                enable: *enable,
            },
            Action::Run { command, args } => Action::Run {
                command: render_template(command, variables)?,
                args: args
                    .iter()
                    .map(|a| render_template(a, variables))
                    .collect::<Result<Vec<_>>>()?,
            },
        };
        Ok(rendered)
    }
}

/// Substitute `{{ variable }}` placeholders in a single template string
pub fn render_template(template: &str, variables: &HashMap<String, String>) -> Result<String> {
    let re = Regex::new(PLACEHOLDER_PATTERN)?;

    let mut unresolved = Vec::new();
    let rendered = re.replace_all(template, |caps: &regex::Captures| {
        let name = &caps[1];
        match variables.get(name) {
            Some(value) => value.clone(),
            None => {
                unresolved.push(name.to_string());
                String::new()
            }
        }
    });

    if !unresolved.is_empty() {
        bail!(
            "unresolved placeholders in '{}': {}",
            template,
            unresolved.join(", ")
        );
    }

    Ok(rendered.into_owned())
}

/// List all placeholder names referenced by a template string
pub fn placeholder_names(template: &str) -> Result<Vec<String>> {
    let re = Regex::new(PLACEHOLDER_PATTERN)?;
    Ok(re
        .captures_iter(template)
        .map(|caps| caps[1].to_string())
        .collect())
}

impl Step {
    /// Create a step from a step config
    pub fn from_config(config: &crate::core::config::StepConfig, defaults: &StepDefaults) -> Self {
        Step {
            id: config.id.clone(),
            name: config.name.clone(),
            action: config.action.clone(),
            idempotent: config
                .idempotent
                .unwrap_or_else(|| config.action.default_idempotent()),
            timeout_secs: config.timeout_secs.unwrap_or(defaults.timeout_secs),
            state: StepState::Pending,
        }
    }
}

/// Plan-level defaults applied to steps without explicit settings
#[derive(Debug, Clone)]
pub struct StepDefaults {
    pub timeout_secs: u64,
}

impl Default for StepDefaults {
    fn default() -> Self {
        Self {
            timeout_secs: 600, // package downloads can be slow
        }
    }
}
