//! CLI module for the manifest tool.
//!
//! This module provides the command-line interface for inspecting
//! workload manifests.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat};
pub use output::{EnvironmentSummary, OutputFormatter};
