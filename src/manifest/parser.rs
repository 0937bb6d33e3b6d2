//! Manifest loader.
//!
//! Loading runs the full pipeline: read the file, substitute variables for the
//! target environment, decode the YAML, then apply that environment's
//! overrides.

use std::path::{Path, PathBuf};

use serde_yaml::Value;
use tracing::{debug, info};

use crate::error::{ConfigError, ManifestError, Result};
use crate::interpolate::{Interpolator, VariableSource};
use crate::union::from_value;

use super::spec::Manifest;

/// Loader for workload manifests.
#[derive(Debug, Clone)]
pub struct ManifestParser {
    /// Application the workload belongs to.
    app: String,
    /// Base path for resolving the `.env` file.
    base_path: Option<PathBuf>,
}

impl ManifestParser {
    /// Creates a parser for workloads of the given application.
    #[must_use]
    pub fn new(app: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            base_path: None,
        }
    }

    /// Sets the base path for resolving the `.env` file.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Returns the application name.
    #[must_use]
    pub fn app(&self) -> &str {
        &self.app
    }

    /// Reads the raw text of a manifest file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or cannot be read.
    pub fn read_file(&self, path: impl AsRef<Path>) -> Result<String> {
        let path = path.as_ref();
        info!("Loading manifest from: {}", path.display());

        if !path.exists() {
            return Err(ManifestError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        std::fs::read_to_string(path).map_err(|e| {
            ManifestError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })
    }

    /// Substitutes variables in raw manifest text for an environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a referenced variable is undefined or a predefined
    /// variable is overridden.
    pub fn interpolate<S: VariableSource>(
        &self,
        content: &str,
        env: &str,
        source: S,
    ) -> Result<String> {
        debug!("Interpolating manifest for environment: {env}");
        let interpolator = Interpolator::new(&self.app, env, source);
        Ok(interpolator.interpolate(content)?)
    }

    /// Parses a manifest from YAML text. No interpolation or overlay is done.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid YAML or does not describe a
    /// manifest.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<Manifest> {
        debug!("Parsing YAML manifest");

        let raw = parse_raw(content, source)?;
        let manifest: Manifest = from_value(&raw)?;

        debug!(
            "Parsed manifest for workload {} with {} environment override(s)",
            manifest.name,
            manifest.environments.len()
        );
        Ok(manifest)
    }

    /// Loads the effective manifest of a workload for an environment.
    ///
    /// # Errors
    ///
    /// Returns an error if any stage of loading fails.
    pub fn load<S: VariableSource>(
        &self,
        path: impl AsRef<Path>,
        env: &str,
        source: S,
    ) -> Result<Manifest> {
        let path = path.as_ref();
        let content = self.read_file(path)?;
        let interpolated = self.interpolate(&content, env, source)?;
        let manifest = self.parse_yaml(&interpolated, Some(path))?;
        Ok(manifest.apply_env(env)?)
    }

    /// Lists the environments a manifest overrides, without interpolating it.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid YAML.
    pub fn environment_names(&self, content: &str) -> Result<Vec<String>> {
        let raw = parse_raw(content, None)?;
        let names = raw
            .get("environments")
            .and_then(Value::as_mapping)
            .map(|envs| {
                envs.keys()
                    .filter_map(|key| key.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();
        Ok(names)
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                ManifestError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

fn parse_raw(content: &str, source: Option<&Path>) -> Result<Value> {
    serde_yaml::from_str(content).map_err(|e| {
        let location = source.map(|p| p.display().to_string());
        ManifestError::Config(ConfigError::ParseError {
            message: format!("YAML parse error: {e}"),
            location,
        })
    })
}

/// Default manifest file names to search for.
pub const DEFAULT_MANIFEST_FILES: &[&str] = &[
    "manifest.yml",
    "manifest.yaml",
    "copilot/manifest.yml",
];

/// Finds the manifest file in the given directory or its parents.
///
/// # Errors
///
/// Returns an error if no manifest file is found.
pub fn find_manifest_file(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_MANIFEST_FILES {
            let manifest_path = current.join(filename);
            if manifest_path.exists() {
                info!("Found manifest file: {}", manifest_path.display());
                return Ok(manifest_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(ManifestError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_MANIFEST_FILES[0]),
    }))
}
