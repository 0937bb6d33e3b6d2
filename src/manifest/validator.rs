//! Manifest validation.
//!
//! Decoding and overlay never validate. Validation runs on the effective
//! manifest of an environment, once every override has been applied, through
//! the [`Validate`] hook each schema type implements.

use std::collections::HashSet;

use tracing::debug;

use crate::error::{ManifestError, Result};
use crate::union::Union;

use super::spec::{
    AdvancedCount, EfsConfig, HealthCheckArgs, HttpConfig, ImageConfig, Manifest, PlatformArgs,
    StorageConfig, VolumeConfig, WorkloadConfig, WorkloadKind,
};

/// Platforms a workload may run on.
const KNOWN_PLATFORMS: &[&str] = &[
    "linux/amd64",
    "linux/x86_64",
    "linux/arm",
    "linux/arm64",
    "windows/amd64",
    "windows/x86_64",
];

/// Validation result containing all problems found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

/// Validation hook implemented by every schema type that has rules.
pub trait Validate {
    /// Checks `self`, recording problems under the field path `path`.
    fn validate(&self, path: &str, result: &mut ValidationResult);
}

/// Validator for effective manifests.
#[derive(Debug, Default)]
pub struct ManifestValidator {
    /// Platforms accepted in `platform`.
    known_platforms: HashSet<String>,
}

impl ManifestValidator {
    /// Creates a new validator with the default platforms.
    #[must_use]
    pub fn new() -> Self {
        Self {
            known_platforms: KNOWN_PLATFORMS.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// Validates an effective manifest.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if any rule fails.
    pub fn validate(&self, manifest: &Manifest) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        manifest.validate("", &mut result);
        self.validate_platform(&manifest.config.platform, &mut result);

        if result.errors.is_empty() {
            debug!("Manifest validation passed");
            Ok(result)
        } else {
            let first_error = &result.errors[0];
            Err(ManifestError::validation(
                first_error.message.clone(),
                first_error.field.clone(),
            ))
        }
    }

    /// Validates the platform against the accepted list.
    fn validate_platform(
        &self,
        platform: &Union<String, PlatformArgs>,
        result: &mut ValidationResult,
    ) {
        let requested = match platform {
            Union::Unset => return,
            Union::Plain(platform) => platform.clone(),
            Union::Structured(args) => {
                if args.osfamily.is_empty() || args.architecture.is_empty() {
                    result.error("platform", "Both osfamily and architecture must be specified");
                    return;
                }
                format!("{}/{}", args.osfamily, args.architecture)
            }
        };

        if !self.known_platforms.contains(&requested.to_lowercase()) {
            result.error("platform", format!("Platform '{requested}' is not supported"));
        }
    }
}

impl Validate for Manifest {
    fn validate(&self, _path: &str, result: &mut ValidationResult) {
        if self.name.is_empty() {
            result.error("name", "Workload name cannot be empty");
        } else if !is_valid_name(&self.name) {
            result.error(
                "name",
                format!(
                    "Workload name '{}' is invalid. Must be lowercase alphanumeric with hyphens.",
                    self.name
                ),
            );
        }

        self.config.validate("", result);

        match self.kind {
            WorkloadKind::LoadBalancedWebService => {
                if self.config.http.is_none() {
                    result.error("http", "A Load Balanced Web Service requires http settings");
                }
                if self.config.image.port == 0 {
                    result.warnings.push(String::from(
                        "image.port: No port set, the load balancer will have no target",
                    ));
                }
            }
            WorkloadKind::ScheduledJob => {
                if self.config.schedule.as_ref().is_none_or(String::is_empty) {
                    result.error("schedule", "A Scheduled Job requires a schedule");
                }
                if self.config.http.is_some() {
                    result.error("http", "A Scheduled Job cannot receive http traffic");
                }
            }
            WorkloadKind::BackendService | WorkloadKind::WorkerService => {
                if self.config.schedule.is_some() {
                    result
                        .warnings
                        .push(format!("schedule: Ignored for a {}", self.kind));
                }
            }
        }
    }
}

impl Validate for WorkloadConfig {
    fn validate(&self, path: &str, result: &mut ValidationResult) {
        self.image.validate(&join(path, "image"), result);

        if self.cpu == 0 {
            result.error(join(path, "cpu"), "CPU units must be greater than 0");
        }
        if self.memory == 0 {
            result.error(join(path, "memory"), "Memory must be greater than 0");
        }

        if let Union::Structured(count) = &self.count {
            count.validate(&join(path, "count"), result);
        }

        if self.command.is_a() && self.entrypoint.is_unset() {
            debug!("Command given without entrypoint, the image entrypoint is kept");
        }

        for name in self.secrets.keys() {
            if self.variables.contains_key(name) {
                result.error(
                    join(path, &format!("secrets.{name}")),
                    format!("'{name}' is defined both as a variable and as a secret"),
                );
            }
        }

        if let Some(http) = &self.http {
            http.validate(&join(path, "http"), result);
        }
        if let Some(storage) = &self.storage {
            storage.validate(&join(path, "storage"), result);
        }
    }
}

impl Validate for ImageConfig {
    fn validate(&self, path: &str, result: &mut ValidationResult) {
        match (self.location.is_empty(), self.build.is_unset()) {
            (true, true) => result.error(path, "Either location or build must be specified"),
            (false, false) => result.error(path, "location and build are mutually exclusive"),
            _ => {}
        }

        if self.location.ends_with(":latest") {
            result.warnings.push(format!(
                "{path}.location: Using ':latest' tag is not recommended for production"
            ));
        }
    }
}

impl Validate for AdvancedCount {
    fn validate(&self, path: &str, result: &mut ValidationResult) {
        if self.range.is_empty() {
            if self.cpu_percentage != 0 || self.memory_percentage != 0 || self.requests != 0 {
                result.error(
                    join(path, "range"),
                    "Autoscaling targets require a range",
                );
            }
        } else {
            match self.parse_range() {
                Some((min, max)) if min <= max => {
                    if self.spot > max {
                        result.warnings.push(format!(
                            "{path}.spot: {} spot tasks exceed the maximum of {max}",
                            self.spot
                        ));
                    }
                }
                Some(_) => result.error(
                    join(path, "range"),
                    format!("Range '{}' has a minimum above its maximum", self.range),
                ),
                None => result.error(
                    join(path, "range"),
                    format!("Range '{}' must look like MIN-MAX", self.range),
                ),
            }
        }

        for (field, value) in [
            ("cpu_percentage", self.cpu_percentage),
            ("memory_percentage", self.memory_percentage),
        ] {
            if value > 100 {
                result.error(
                    join(path, field),
                    format!("Percentage {value} must be between 1 and 100"),
                );
            }
        }
    }
}

impl Validate for HttpConfig {
    fn validate(&self, path: &str, result: &mut ValidationResult) {
        if self.path.is_empty() {
            result.error(join(path, "path"), "A request path must be specified");
        }

        match &self.healthcheck {
            Union::Plain(check_path) if !check_path.starts_with('/') => result.error(
                join(path, "healthcheck"),
                format!("Health check path must start with '/': {check_path}"),
            ),
            Union::Structured(args) => args.validate(&join(path, "healthcheck"), result),
            _ => {}
        }
    }
}

impl Validate for HealthCheckArgs {
    fn validate(&self, path: &str, result: &mut ValidationResult) {
        for (field, value) in [
            ("healthy_threshold", self.healthy_threshold),
            ("unhealthy_threshold", self.unhealthy_threshold),
        ] {
            if value != 0 && !(2..=10).contains(&value) {
                result.error(
                    join(path, field),
                    format!("Threshold {value} must be between 2 and 10"),
                );
            }
        }

        if self.interval_secs != 0 && self.timeout_secs >= self.interval_secs {
            result.error(
                join(path, "timeout_secs"),
                "Timeout must be shorter than the interval",
            );
        }
    }
}

impl Validate for StorageConfig {
    fn validate(&self, path: &str, result: &mut ValidationResult) {
        let mut seen_paths = HashSet::new();

        for (name, volume) in &self.volumes {
            let volume_path = join(path, &format!("volumes.{name}"));
            if !volume.path.is_empty() && !seen_paths.insert(volume.path.as_str()) {
                result.error(
                    join(&volume_path, "path"),
                    format!("Duplicate mount path: {}", volume.path),
                );
            }
            volume.validate(&volume_path, result);
        }
    }
}

impl Validate for VolumeConfig {
    fn validate(&self, path: &str, result: &mut ValidationResult) {
        if !self.path.starts_with('/') {
            result.error(
                join(path, "path"),
                format!("Mount path must be absolute: {}", self.path),
            );
        }

        if let Union::Structured(efs) = &self.efs {
            efs.validate(&join(path, "efs"), result);
        }
    }
}

impl Validate for EfsConfig {
    fn validate(&self, path: &str, result: &mut ValidationResult) {
        if self.id.is_empty() && (!self.root_dir.is_empty() || self.uid != 0 || self.gid != 0) {
            result.error(
                join(path, "id"),
                "A file system ID is required when configuring an existing file system",
            );
        }

        if (self.uid == 0) != (self.gid == 0) {
            result.error(path, "uid and gid must be specified together");
        }
    }
}

/// Joins a field path and a field name.
fn join(path: &str, field: &str) -> String {
    if path.is_empty() {
        field.to_string()
    } else {
        format!("{path}.{field}")
    }
}

/// Validates that a name follows the naming convention.
/// Names must be lowercase alphanumeric with hyphens, starting with a letter.
fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();

    match chars.next() {
        Some(first) if first.is_ascii_lowercase() => {}
        _ => return false,
    }

    if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
        return false;
    }

    !name.ends_with('-') && !name.contains("--")
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Records an error for a field.
    pub fn error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationError {
            field: field.into(),
            message: message.into(),
        });
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}
