//! System package stage (apt)
//!
//! Builds and runs `apt-get` command lines. All invocations are
//! non-interactive; purge, upgrade and install get `-y` so a provisioning
//! run never blocks on a prompt.

use crate::core::step::AptOp;
use crate::system::{CommandLine, CommandOutput, CommandRunner, OutputCallback, SystemError};

/// Build the `apt-get` command line for an operation
pub fn apt_command(op: AptOp, packages: &[String]) -> CommandLine {
    let cmd = CommandLine::new("apt-get").env("DEBIAN_FRONTEND", "noninteractive");
    match op {
        AptOp::Purge => cmd.arg("purge").arg("-y").args(packages.iter().cloned()),
        AptOp::Update => cmd.arg("update"),
        AptOp::Upgrade => cmd.arg("upgrade").arg("-y"),
        AptOp::Install => cmd.arg("install").arg("-y").args(packages.iter().cloned()),
    }
}

/// Run an apt-get operation through the given runner
pub async fn run(
    runner: &dyn CommandRunner,
    op: AptOp,
    packages: &[String],
    callback: Option<&dyn OutputCallback>,
) -> Result<CommandOutput, SystemError> {
    let cmd = apt_command(op, packages);
    runner.run_streaming(&cmd, callback).await
}
