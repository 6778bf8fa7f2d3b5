//! Command model and error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors from system mutation (subprocesses and filesystem operations)
///
/// Every variant is fatal to the run: the first error aborts all
/// remaining steps.
#[derive(Debug, Error)]
pub enum SystemError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with code {code}: {stderr}")]
    ExitStatus {
        program: String,
        code: i32,
        stderr: String,
    },

    #[error("timeout after {0} seconds")]
    Timeout(u64),

    #[error("overlay source {0} does not exist or is not a directory")]
    MissingSource(PathBuf),

    #[error("unknown user or group: {0}")]
    UnknownOwner(String),

    #[error("destination parent {0} does not exist")]
    MissingDestParent(PathBuf),

    #[error("unit file {0} does not exist")]
    MissingUnit(PathBuf),

    #[error("requirements manifest {0} does not exist")]
    MissingManifest(PathBuf),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Internal(String),
}

/// A fully resolved command line, ready to spawn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    /// Program name or path
    pub program: String,

    /// Arguments, in order
    pub args: Vec<String>,

    /// Extra environment variables for the child process
    pub env: Vec<(String, String)>,
}

impl CommandLine {
    /// Create a command line with no arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    /// Append a single argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the child process
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Render the command for logs and plan previews
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Captured output of a finished command
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}
