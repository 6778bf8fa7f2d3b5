//! provision - A declarative provisioning runner for Raspberry Pi camera-trap images

pub mod cli;
pub mod core;
pub mod execution;
pub mod journal;
pub mod stages;
pub mod system;

// Re-export commonly used types
pub use crate::core::config::PlanConfig;
pub use crate::core::{Plan, RunContext, RunState, RunStatus, Step, StepState};
pub use crate::execution::{RunEngine, RunEvent, StepExecutor, StepOutcome};
pub use crate::journal::{InMemoryJournal, Journal, JsonJournal, RunSummary};
pub use crate::system::{CommandLine, CommandOutput, CommandRunner, ShellRunner, SystemError};
