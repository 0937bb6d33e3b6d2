//! Workload manifest module.
//!
//! This module handles everything built on top of the core engines:
//! - The workload schema of `manifest.yml`
//! - Loading a manifest for an environment
//! - Validation of the effective manifest
//! - Computing manifest digests for change detection

mod spec;
mod parser;
mod validator;
mod hash;

pub use spec::{
    AdvancedCount, BuildArgs, EfsConfig, HealthCheckArgs, HttpConfig, ImageConfig, Manifest,
    PlatformArgs, StorageConfig, VolumeConfig, WorkloadConfig, WorkloadKind,
};
pub use parser::{DEFAULT_MANIFEST_FILES, ManifestParser, find_manifest_file};
pub use validator::{ManifestValidator, Validate, ValidationError, ValidationResult};
pub use hash::ManifestHasher;
