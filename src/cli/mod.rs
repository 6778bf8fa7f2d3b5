//! Command-line interface

pub mod commands;
pub mod output;
pub mod printer;

use clap::{Parser, Subcommand};
use commands::{ApplyCommand, HistoryCommand, PlanCommand, ValidateCommand};

/// Provisioning runner for Raspberry Pi camera-trap images
#[derive(Debug, Parser, Clone)]
#[command(name = "provision")]
#[command(version = "0.1.0")]
#[command(about = "A declarative provisioning runner for Raspberry Pi camera-trap images", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Stream subprocess output as it arrives
    #[arg(short, long, global = true)]
    pub stream: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Apply a provisioning plan to this host
    Apply(ApplyCommand),

    /// Validate a plan file without applying it
    Validate(ValidateCommand),

    /// Preview the commands a plan would run
    Plan(PlanCommand),

    /// Show run history
    History(HistoryCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}

use std::ffi::OsString;
