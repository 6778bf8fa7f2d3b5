//! Python dependency stage (pip)

use crate::system::{CommandLine, CommandOutput, CommandRunner, OutputCallback, SystemError};
use std::path::Path;

/// Build the pip command line for a requirements manifest
pub fn pip_command(requirements: &str, python: Option<&str>) -> CommandLine {
    CommandLine::new(python.unwrap_or("pip3"))
        .arg("install")
        .arg("-r")
        .arg(requirements)
}

/// Install Python dependencies from a requirements manifest
///
/// Fails up front when the manifest does not exist so pip's own, less
/// specific error never reaches the user.
pub async fn run(
    runner: &dyn CommandRunner,
    requirements: &str,
    python: Option<&str>,
    callback: Option<&dyn OutputCallback>,
) -> Result<CommandOutput, SystemError> {
    let manifest = Path::new(requirements);
    if !manifest.is_file() {
        return Err(SystemError::MissingManifest(manifest.to_path_buf()));
    }

    let cmd = pip_command(requirements, python);
    runner.run_streaming(&cmd, callback).await
}
