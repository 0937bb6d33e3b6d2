//! Manifest specification types.
//!
//! This module defines the structs that map to a workload `manifest.yml`.
//! Every field of [`WorkloadConfig`] may be repeated under `environments.<name>`
//! to override the base value for that environment.

use std::collections::BTreeMap;

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::OverlayError;
use crate::overlay::{self, impl_merge};
use crate::union::{AOrB, IsZero, Union, from_value, impl_is_zero, to_de_error};

/// The root of a workload manifest.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Manifest {
    /// Workload name.
    pub name: String,
    /// Kind of workload.
    #[serde(rename = "type")]
    pub kind: WorkloadKind,
    /// Base configuration shared by every environment.
    #[serde(flatten)]
    pub config: WorkloadConfig,
    /// Per-environment overrides of the base configuration.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub environments: BTreeMap<String, WorkloadConfig>,
}

/// Keys of a manifest that are not part of [`WorkloadConfig`].
#[derive(Deserialize)]
struct ManifestHeader {
    name: String,
    #[serde(rename = "type")]
    kind: WorkloadKind,
    #[serde(default)]
    environments: BTreeMap<String, WorkloadConfig>,
}

// The base configuration shares its mapping with the header keys. Both are
// decoded from the same raw value rather than through `flatten`, which would
// buffer the fields and lose scalar-to-string coercion.
impl<'de> Deserialize<'de> for Manifest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        let header: ManifestHeader = from_value(&raw).map_err(to_de_error)?;
        let config: WorkloadConfig = from_value(&raw).map_err(to_de_error)?;

        Ok(Self {
            name: header.name,
            kind: header.kind,
            config,
            environments: header.environments,
        })
    }
}

/// Workload kinds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum WorkloadKind {
    /// Internet-facing service behind a load balancer.
    #[serde(rename = "Load Balanced Web Service")]
    LoadBalancedWebService,
    /// Service reachable only from inside the environment.
    #[serde(rename = "Backend Service")]
    BackendService,
    /// Service consuming messages from a queue.
    #[serde(rename = "Worker Service")]
    WorkerService,
    /// Task run on a schedule.
    #[serde(rename = "Scheduled Job")]
    ScheduledJob,
}

/// Configuration that can be overridden per environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkloadConfig {
    /// Container image to run.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub image: ImageConfig,
    /// CPU units reserved for each task.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub cpu: u32,
    /// Memory in MiB reserved for each task.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub memory: u32,
    /// Number of tasks: a fixed count or an autoscaling policy.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub count: Union<u32, AdvancedCount>,
    /// Target platform: `linux/amd64` or an explicit OS/architecture pair.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub platform: Union<String, PlatformArgs>,
    /// Command override, as a string or an argument list.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub command: AOrB<String, Vec<String>>,
    /// Entrypoint override, as a string or an argument list.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub entrypoint: AOrB<String, Vec<String>>,
    /// Plain environment variables.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub variables: BTreeMap<String, String>,
    /// Secret references, by variable name.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub secrets: BTreeMap<String, String>,
    /// Load balancer routing.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub http: Option<HttpConfig>,
    /// Schedule expression for jobs.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub schedule: Option<String>,
    /// Attached storage.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub storage: Option<StorageConfig>,
    /// Whether interactive exec into running tasks is allowed.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub exec: Option<bool>,
    /// Resource tags.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub tags: BTreeMap<String, String>,
    /// Free-form settings passed through to deployment tooling untouched.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub extensions: BTreeMap<String, Value>,
}

/// Container image configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ImageConfig {
    /// Prebuilt image URI.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub location: String,
    /// Dockerfile path, or full build arguments.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub build: Union<String, BuildArgs>,
    /// Port the container listens on.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub port: u16,
}

/// Docker build arguments.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BuildArgs {
    /// Build context directory.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub context: String,
    /// Path to the Dockerfile.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub dockerfile: String,
    /// Build stage to target.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub target: String,
    /// Build-time arguments.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub args: BTreeMap<String, String>,
}

/// Autoscaling configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AdvancedCount {
    /// Task count range, e.g. `1-10`.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub range: String,
    /// Target average CPU utilization, in percent.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub cpu_percentage: u32,
    /// Target average memory utilization, in percent.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub memory_percentage: u32,
    /// Target requests per task.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub requests: u32,
    /// Number of tasks to run on spot capacity.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub spot: u32,
}

/// Explicit platform selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PlatformArgs {
    /// Operating system family, e.g. `linux`.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub osfamily: String,
    /// CPU architecture, e.g. `arm64`.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub architecture: String,
}

/// Load balancer routing configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HttpConfig {
    /// Request path routed to the service.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub path: String,
    /// Health check path, or full health check settings.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub healthcheck: Union<String, HealthCheckArgs>,
    /// Domain alias, or several.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub alias: AOrB<String, Vec<String>>,
    /// Whether sticky sessions are enabled.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub stickiness: Option<bool>,
    /// Container port receiving traffic, if not the image port.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub target_port: u16,
}

/// Health check settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HealthCheckArgs {
    /// Path probed by the load balancer.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub path: String,
    /// HTTP codes considered healthy, e.g. `200,301`.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub success_codes: String,
    /// Consecutive successes before a target is healthy.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub healthy_threshold: u32,
    /// Consecutive failures before a target is unhealthy.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub unhealthy_threshold: u32,
    /// Seconds between probes.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub interval_secs: u32,
    /// Seconds before a probe times out.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub timeout_secs: u32,
}

/// Storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StorageConfig {
    /// Mount the root filesystem read-only.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub readonly_fs: Option<bool>,
    /// Volumes by name.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub volumes: BTreeMap<String, VolumeConfig>,
}

/// A mounted volume.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct VolumeConfig {
    /// Mount path inside the container.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub path: String,
    /// Mount the volume read-only.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub read_only: Option<bool>,
    /// `true` for a managed file system, or an existing one.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub efs: Union<bool, EfsConfig>,
}

/// An existing EFS file system.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EfsConfig {
    /// File system ID.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub id: String,
    /// Directory of the file system to mount.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub root_dir: String,
    /// POSIX user ID for the mount.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub uid: u32,
    /// POSIX group ID for the mount.
    #[serde(skip_serializing_if = "IsZero::is_zero")]
    pub gid: u32,
}

impl_is_zero!(WorkloadConfig {
    image,
    cpu,
    memory,
    count,
    platform,
    command,
    entrypoint,
    variables,
    secrets,
    http,
    schedule,
    storage,
    exec,
    tags,
    extensions,
});
impl_is_zero!(ImageConfig { location, build, port });
impl_is_zero!(BuildArgs {
    context,
    dockerfile,
    target,
    args,
});
impl_is_zero!(AdvancedCount {
    range,
    cpu_percentage,
    memory_percentage,
    requests,
    spot,
});
impl_is_zero!(PlatformArgs { osfamily, architecture });
impl_is_zero!(HttpConfig {
    path,
    healthcheck,
    alias,
    stickiness,
    target_port,
});
impl_is_zero!(HealthCheckArgs {
    path,
    success_codes,
    healthy_threshold,
    unhealthy_threshold,
    interval_secs,
    timeout_secs,
});
impl_is_zero!(StorageConfig { readonly_fs, volumes });
impl_is_zero!(VolumeConfig { path, read_only, efs });
impl_is_zero!(EfsConfig {
    id,
    root_dir,
    uid,
    gid,
});

impl_merge!(WorkloadConfig {
    image,
    cpu,
    memory,
    count,
    platform,
    command,
    entrypoint,
    variables,
    secrets,
    http,
    schedule,
    storage,
    exec,
    tags,
    extensions,
});
impl_merge!(ImageConfig { location, build, port });
impl_merge!(BuildArgs {
    context,
    dockerfile,
    target,
    args,
});
impl_merge!(AdvancedCount {
    range,
    cpu_percentage,
    memory_percentage,
    requests,
    spot,
});
impl_merge!(PlatformArgs { osfamily, architecture });
impl_merge!(HttpConfig {
    path,
    healthcheck,
    alias,
    stickiness,
    target_port,
});
impl_merge!(HealthCheckArgs {
    path,
    success_codes,
    healthy_threshold,
    unhealthy_threshold,
    interval_secs,
    timeout_secs,
});
impl_merge!(StorageConfig { readonly_fs, volumes });
impl_merge!(VolumeConfig { path, read_only, efs });
impl_merge!(EfsConfig {
    id,
    root_dir,
    uid,
    gid,
});

impl Manifest {
    /// Returns the effective manifest for an environment.
    ///
    /// The environment's override is merged into a copy of the base
    /// configuration and the result carries no further environments. An
    /// environment without an override yields an unchanged copy.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::MergeConflict`] tagged with `env` if the
    /// override cannot be merged.
    pub fn apply_env(&self, env: &str) -> Result<Self, OverlayError> {
        let Some(patch) = self.environments.get(env) else {
            return Ok(self.clone());
        };

        let config = overlay::resolve(&self.config, Some(patch))
            .map_err(|err| err.in_environment(env))?;

        Ok(Self {
            name: self.name.clone(),
            kind: self.kind,
            config,
            environments: BTreeMap::new(),
        })
    }

    /// Returns the names of environments with an override.
    #[must_use]
    pub fn environment_names(&self) -> Vec<&str> {
        self.environments.keys().map(String::as_str).collect()
    }

    /// Returns the workload name qualified with an environment.
    #[must_use]
    pub fn qualified_name(&self, env: &str) -> String {
        format!("{}-{}", self.name, env)
    }
}

impl WorkloadKind {
    /// Returns the manifest spelling of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LoadBalancedWebService => "Load Balanced Web Service",
            Self::BackendService => "Backend Service",
            Self::WorkerService => "Worker Service",
            Self::ScheduledJob => "Scheduled Job",
        }
    }
}

impl std::fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AdvancedCount {
    /// Parses `range` into its bounds, e.g. `1-10` into `(1, 10)`.
    #[must_use]
    pub fn parse_range(&self) -> Option<(u32, u32)> {
        let (min, max) = self.range.split_once('-')?;
        Some((min.trim().parse().ok()?, max.trim().parse().ok()?))
    }
}

impl WorkloadConfig {
    /// Returns the desired task count at deployment time: the fixed count,
    /// or the lower bound of an autoscaling range.
    #[must_use]
    pub fn desired_count(&self) -> Option<u32> {
        match &self.count {
            Union::Unset => None,
            Union::Plain(count) => Some(*count),
            Union::Structured(advanced) => advanced.parse_range().map(|(min, _)| min),
        }
    }
}
