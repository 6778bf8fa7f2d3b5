//! System command boundary
//!
//! All package-manager, pip, and service-manager invocations go through the
//! [`CommandRunner`] trait so stages can be exercised in tests without
//! touching the host.

pub mod command;
pub mod shell;
pub mod streaming;

use async_trait::async_trait;
pub use command::{CommandLine, CommandOutput, SystemError};
pub use shell::ShellRunner;
pub use streaming::{NoopCallback, OutputCallback, OutputLine, OutputStream};

/// Trait for running external commands - allows for mock implementations
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a command, delivering output lines to the callback as they arrive
    async fn run_streaming(
        &self,
        cmd: &CommandLine,
        callback: Option<&dyn OutputCallback>,
    ) -> Result<CommandOutput, SystemError>;

    /// Run a command, capturing output without streaming
    async fn run(&self, cmd: &CommandLine) -> Result<CommandOutput, SystemError> {
        self.run_streaming(cmd, None).await
    }
}
