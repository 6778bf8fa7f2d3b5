//! Streaming support for subprocess output
//!
//! Lines written by a child process are delivered to an [`OutputCallback`]
//! as they arrive, so long-running operations (package downloads, upgrades)
//! stay visible in the terminal instead of appearing all at once at the end.

/// Which stream a line arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// One line of subprocess output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub stream: OutputStream,
    pub line: String,
}

impl OutputLine {
    pub fn stdout(line: impl Into<String>) -> Self {
        Self {
            stream: OutputStream::Stdout,
            line: line.into(),
        }
    }

    pub fn stderr(line: impl Into<String>) -> Self {
        Self {
            stream: OutputStream::Stderr,
            line: line.into(),
        }
    }
}

/// Callback for processing output lines as they arrive
///
/// This trait is object-safe and can be used as `&dyn OutputCallback`.
pub trait OutputCallback: Send + Sync {
    /// Called for each line read from the subprocess
    fn on_line(&self, line: &OutputLine);
}

/// No-op callback that discards all output
#[derive(Debug, Clone, Default)]
pub struct NoopCallback;

impl OutputCallback for NoopCallback {
    fn on_line(&self, _line: &OutputLine) {}
}
