//! Manifest hashing for change detection.
//!
//! Two manifests hash equal exactly when they serialize to the same YAML, so
//! comparing the digest of an environment's effective manifest with that of
//! the base tells whether the environment changes anything.

use sha2::{Digest, Sha256};

use crate::error::{ConfigError, ManifestError, Result};

use super::spec::{Manifest, WorkloadConfig};

/// Hasher for computing manifest digests.
#[derive(Debug, Default)]
pub struct ManifestHasher;

impl ManifestHasher {
    /// Creates a new manifest hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes a digest of an entire manifest, including its environments.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest cannot be serialized.
    pub fn hash_manifest(&self, manifest: &Manifest) -> Result<String> {
        let mut hasher = Sha256::new();
        hasher.update(manifest.name.as_bytes());
        hasher.update(manifest.kind.as_str().as_bytes());
        hasher.update(self.hash_config(&manifest.config)?.as_bytes());

        // BTreeMap iteration keeps environment order deterministic
        for (name, config) in &manifest.environments {
            hasher.update(name.as_bytes());
            hasher.update(self.hash_config(config)?.as_bytes());
        }

        Ok(hex::encode(hasher.finalize()))
    }

    /// Computes a digest of a single workload configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized.
    pub fn hash_config(&self, config: &WorkloadConfig) -> Result<String> {
        let rendered = serde_yaml::to_string(config).map_err(|e| {
            ManifestError::Config(ConfigError::SerializationError {
                message: e.to_string(),
            })
        })?;
        Ok(hex::encode(Sha256::digest(rendered.as_bytes())))
    }

    /// Computes a short hash (first 8 characters) for display purposes.
    #[must_use]
    pub fn short_hash(&self, hash: &str) -> String {
        hash.chars().take(8).collect()
    }
}
