//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Manifest - Inspect workload manifests per environment.
#[derive(Parser, Debug)]
#[command(name = "manifest")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the manifest file.
    #[arg(short, long, global = true, env = "MANIFEST_FILE")]
    pub file: Option<PathBuf>,

    /// Application the workload belongs to.
    #[arg(short, long, global = true, env = "MANIFEST_APP", default_value = "app")]
    pub app: String,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate the effective manifest of an environment.
    Validate {
        /// Target environment.
        #[arg(short, long)]
        env: String,

        /// Show all warnings, not just errors.
        #[arg(short, long)]
        warnings: bool,
    },

    /// Print the effective manifest of an environment.
    Render {
        /// Target environment.
        #[arg(short, long)]
        env: String,
    },

    /// List the environments the manifest overrides.
    Envs,

    /// Print the manifest text with variables substituted.
    Interpolate {
        /// Target environment.
        #[arg(short, long)]
        env: String,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_render() {
        let cli = Cli::try_parse_from([
            "manifest", "--file", "svc/manifest.yml", "render", "--env", "prod",
        ])
        .unwrap();
        assert_eq!(cli.file, Some(PathBuf::from("svc/manifest.yml")));
        assert!(matches!(cli.command, Commands::Render { ref env } if env == "prod"));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "manifest", "validate", "-e", "test", "--app", "shop", "--output", "json", "-w",
        ])
        .unwrap();
        assert_eq!(cli.app, "shop");
        assert!(matches!(cli.output, OutputFormat::Json));
        assert!(matches!(
            cli.command,
            Commands::Validate { ref env, warnings: true } if env == "test"
        ));
    }

    #[test]
    fn test_env_is_required() {
        assert!(Cli::try_parse_from(["manifest", "render"]).is_err());
    }
}
