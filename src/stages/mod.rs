//! Provisioning stages
//!
//! One module per action kind. Stages build command lines and perform
//! filesystem work; they never decide ordering or failure policy, that
//! belongs to the execution engine.

pub mod overlay;
pub mod packages;
pub mod python;
pub mod services;

use crate::core::step::Action;
use crate::system::CommandLine;
use std::path::Path;

/// Human-readable preview of what an action will do
///
/// Used by `provision plan` to show the effect of each step without
/// touching the host.
pub fn describe(action: &Action) -> Vec<String> {
    match action {
        Action::UnpackOverlay { source, dest, owner } => {
            let mut lines = vec![format!("unpack {} -> {}", source, dest)];
            if let Some(owner) = owner {
                lines.push(format!("chown -R {}", owner));
            }
            lines
        }
        Action::Apt { op, packages } => {
            vec![packages::apt_command(*op, packages).display()]
        }
        Action::PipInstall {
            requirements,
            python,
        } => {
            vec![python::pip_command(requirements, python.as_deref()).display()]
        }
        Action::InstallService {
            unit,
            service_dir,
            enable,
        } => {
            let dir = service_dir
                .as_deref()
                .unwrap_or(services::DEFAULT_SERVICE_DIR);
            let unit_name = Path::new(unit)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| unit.clone());
            let mut lines = vec![format!("install {} -> {}/{}", unit, dir, unit_name)];
            if *enable {
                lines.push(services::enable_command(&unit_name).display());
            }
            lines
        }
        Action::Run { command, args } => {
            vec![CommandLine::new(command.clone())
                .args(args.iter().cloned())
                .display()]
        }
    }
}
