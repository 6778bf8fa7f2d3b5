//! Core domain models for provisioning plans
//!
//! This module defines the fundamental data structures that represent
//! plans, steps, and their configuration.

pub mod config;
pub mod context;
pub mod plan;
pub mod state;
pub mod step;

pub use context::*;
pub use plan::*;
pub use state::*;
pub use step::*;
