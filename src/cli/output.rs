//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::error::{ConfigError, ManifestError, Result};
use crate::manifest::{Manifest, ManifestHasher, ValidationResult};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// How one environment relates to the base manifest.
#[derive(Debug, Clone, Serialize)]
pub struct EnvironmentSummary {
    /// Environment name.
    pub name: String,
    /// Digest of the effective configuration.
    pub digest: String,
    /// Whether the override changes anything.
    pub overrides: bool,
    /// Desired task count, if known.
    pub count: Option<u32>,
}

/// Environment row for table display.
#[derive(Tabled)]
struct EnvironmentRow {
    #[tabled(rename = "Environment")]
    name: String,
    #[tabled(rename = "Digest")]
    digest: String,
    #[tabled(rename = "Overrides")]
    overrides: String,
    #[tabled(rename = "Count")]
    count: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats an effective manifest: YAML for text output, JSON otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest cannot be serialized.
    pub fn format_manifest(&self, manifest: &Manifest) -> Result<String> {
        let rendered = match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(manifest)
                .map(|mut json| {
                    json.push('\n');
                    json
                })
                .map_err(|e| e.to_string()),
            OutputFormat::Text => serde_yaml::to_string(manifest).map_err(|e| e.to_string()),
        };

        rendered.map_err(|message| {
            ManifestError::Config(ConfigError::SerializationError { message })
        })
    }

    /// Formats interpolated manifest text.
    #[must_use]
    pub fn format_interpolated(&self, env: &str, text: &str) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({ "environment": env, "manifest": text });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => text.to_string(),
        }
    }

    /// Formats the outcome of validating an environment.
    #[must_use]
    pub fn format_validation(
        &self,
        manifest: &Manifest,
        env: &str,
        digest: &str,
        result: &ValidationResult,
        show_warnings: bool,
    ) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "workload": manifest.name,
                    "type": manifest.kind.as_str(),
                    "environment": env,
                    "digest": digest,
                    "valid": result.is_valid(),
                    "errors": result.errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
                    "warnings": result.warnings,
                });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => {
                let mut output = format!(
                    "{} Manifest '{}' is valid for environment '{env}'\n",
                    "✓".green(),
                    manifest.qualified_name(env)
                );

                let _ = writeln!(output, "\nManifest summary:");
                let _ = writeln!(output, "   Type: {}", manifest.kind);
                let _ = writeln!(output, "   Digest: {}", Self::short(digest));
                let _ = writeln!(output, "   CPU: {}", manifest.config.cpu);
                let _ = writeln!(output, "   Memory: {} MiB", manifest.config.memory);
                if let Some(count) = manifest.config.desired_count() {
                    let _ = writeln!(output, "   Count: {count}");
                }

                if show_warnings && !result.warnings.is_empty() {
                    let _ = write!(
                        output,
                        "\n{} Warnings ({}):\n",
                        "⚠".yellow(),
                        result.warning_count()
                    );
                    for warning in &result.warnings {
                        let _ = writeln!(output, "   - {warning}");
                    }
                }

                output
            }
        }
    }

    /// Formats the environment overview of a manifest.
    #[must_use]
    pub fn format_environments(&self, workload: &str, envs: &[EnvironmentSummary]) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({ "workload": workload, "environments": envs });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => {
                if envs.is_empty() {
                    return format!(
                        "{} No environment overrides - every environment uses the base manifest.\n",
                        "✓".green()
                    );
                }

                let mut output = format!("\nWorkload: {workload}\n\n");

                let rows: Vec<EnvironmentRow> = envs
                    .iter()
                    .map(|e| EnvironmentRow {
                        name: e.name.clone(),
                        digest: Self::short(&e.digest),
                        overrides: if e.overrides {
                            "yes".yellow().to_string()
                        } else {
                            "no".dimmed().to_string()
                        },
                        count: e.count.map_or_else(|| String::from("-"), |c| c.to_string()),
                    })
                    .collect();

                output.push_str(&Table::new(rows).to_string());
                output.push('\n');

                let changed = envs.iter().filter(|e| e.overrides).count();
                let _ = write!(
                    output,
                    "\n{} of {} environment(s) differ from the base.\n",
                    changed.to_string().yellow(),
                    envs.len()
                );

                output
            }
        }
    }

    /// Formats an error message.
    #[must_use]
    pub fn error(&self, message: &str) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({ "status": "error", "message": message });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => format!("{} {message}", "✗".red()),
        }
    }

    /// Shortens a digest for display.
    fn short(digest: &str) -> String {
        ManifestHasher::new().short_hash(digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{WorkloadConfig, WorkloadKind};
    use std::collections::BTreeMap;

    fn manifest() -> Manifest {
        Manifest {
            name: String::from("api"),
            kind: WorkloadKind::BackendService,
            config: WorkloadConfig {
                cpu: 256,
                memory: 512,
                ..WorkloadConfig::default()
            },
            environments: BTreeMap::new(),
        }
    }

    fn summary(name: &str, overrides: bool) -> EnvironmentSummary {
        EnvironmentSummary {
            name: name.to_string(),
            digest: String::from("0123456789abcdef"),
            overrides,
            count: Some(1),
        }
    }

    #[test]
    fn test_format_manifest_text_is_yaml() {
        let text = OutputFormatter::new(OutputFormat::Text)
            .format_manifest(&manifest())
            .unwrap();
        assert!(text.contains("name: api"));
        assert!(text.contains("type: Backend Service"));
        assert!(!text.contains("environments"));
    }

    #[test]
    fn test_format_manifest_json() {
        let json = OutputFormatter::new(OutputFormat::Json)
            .format_manifest(&manifest())
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["cpu"], 256);
        assert_eq!(value["type"], "Backend Service");
    }

    #[test]
    fn test_format_environments_json() {
        let json = OutputFormatter::new(OutputFormat::Json)
            .format_environments("api", &[summary("prod", true), summary("test", false)]);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["environments"][0]["name"], "prod");
        assert_eq!(value["environments"][1]["overrides"], false);
    }

    #[test]
    fn test_format_environments_text_table() {
        colored::control::set_override(false);
        let text = OutputFormatter::new(OutputFormat::Text)
            .format_environments("api", &[summary("prod", true)]);
        assert!(text.contains("Workload: api"));
        assert!(text.contains("Environment"));
        assert!(text.contains("01234567"));
        assert!(text.contains("1 of 1 environment(s)"));
    }

    #[test]
    fn test_format_validation_text() {
        colored::control::set_override(false);
        let result = ValidationResult {
            errors: Vec::new(),
            warnings: vec![String::from("image.location: Using ':latest' tag")],
        };
        let formatter = OutputFormatter::new(OutputFormat::Text);

        let digest = "0123456789abcdef";

        let text = formatter.format_validation(&manifest(), "prod", digest, &result, true);
        assert!(text.contains("Manifest 'api-prod' is valid"));
        assert!(text.contains("Digest: 01234567\n"));
        assert!(text.contains("Warnings (1):"));

        let text = formatter.format_validation(&manifest(), "prod", digest, &result, false);
        assert!(!text.contains("Warnings"));
    }

    #[test]
    fn test_format_validation_json() {
        let json = OutputFormatter::new(OutputFormat::Json).format_validation(
            &manifest(),
            "prod",
            "0123456789abcdef",
            &ValidationResult::default(),
            false,
        );
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["digest"], "0123456789abcdef");
        assert_eq!(value["valid"], true);
    }

    #[test]
    fn test_format_interpolated_text_is_verbatim() {
        let text = "name: api\n";
        assert_eq!(
            OutputFormatter::new(OutputFormat::Text).format_interpolated("prod", text),
            text
        );
    }
}
