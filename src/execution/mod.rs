//! Plan execution

pub mod engine;
pub mod executor;

pub use engine::{EventHandler, RunEngine, RunEvent};
pub use executor::{StepExecutor, StepOutcome};
