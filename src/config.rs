//! Watcher configuration
//!
//! The effective configuration is merged from an optional `vigia.toml`
//! discovered in the working directory, then from explicit overrides.
//! Later layers win field by field. Every layer is validated before it is
//! merged, so a bad file or override never leaves a half-built config.

use crate::error::{Result, VigiaError};
use crate::filter::SubsystemFilter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One partial configuration source. Absent fields leave the lower layer untouched.
///
/// # Example TOML
/// ```toml
/// output = "vigia.log"
/// structured = true
/// frequency = false
/// modules = ["fs", "require"]
/// require_tree_output = "tree.json"
/// dependencies = false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigLayer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modules: Option<Vec<String>>,
    #[serde(
        default,
        alias = "requireTreeOutput",
        skip_serializing_if = "Option::is_none"
    )]
    pub require_tree_output: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<bool>,
    /// Keys this version does not understand
    #[serde(flatten, default, skip_serializing)]
    pub unknown: BTreeMap<String, toml::Value>,
}

impl ConfigLayer {
    /// Parse a layer from TOML text; type mismatches fail here
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let layer: ConfigLayer = toml::from_str(content)?;
        for key in layer.unknown.keys() {
            warn!("Ignoring unknown configuration key '{}'", key);
        }
        Ok(layer)
    }

    /// Read a layer from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            VigiaError::Config(format!(
                "Failed to read configuration file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }
}

/// Immutable configuration snapshot, built once before instrumentation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    /// Summary sink; `None` prints to stdout
    pub output: Option<PathBuf>,
    /// Structured (timestamp + payload object) records instead of positional text
    pub structured: bool,
    /// Count occurrences instead of deduplicating
    pub frequency: bool,
    /// Aggregate into a shutdown summary; when off every call is logged as it happens
    pub summary: bool,
    /// Watched subsystems
    pub modules: SubsystemFilter,
    /// Where to write the dependency tree document, if anywhere
    pub require_tree_output: Option<PathBuf>,
    /// Keep calls attributable to vendored third-party units
    pub dependencies: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output: None,
            structured: false,
            frequency: false,
            summary: true,
            modules: SubsystemFilter::all(),
            require_tree_output: None,
            dependencies: false,
        }
    }
}

impl Config {
    /// Name of the configuration file looked up in the working directory
    pub const FILE_NAME: &'static str = "vigia.toml";

    /// Look for `vigia.toml` in `dir`
    pub fn discover(dir: &Path) -> Result<Option<ConfigLayer>> {
        let candidate = dir.join(Self::FILE_NAME);
        if !candidate.is_file() {
            return Ok(None);
        }
        debug!("Loading configuration from {}", candidate.display());
        ConfigLayer::from_file(&candidate).map(Some)
    }

    /// Discover the file layer in `dir`, then apply `overrides` on top
    pub fn load(dir: &Path, overrides: Option<ConfigLayer>) -> Result<Self> {
        let file_layer = Self::discover(dir)?;
        Self::from_layers(dir, file_layer.into_iter().chain(overrides))
    }

    /// Merge layers in order over the defaults. Relative sink paths are
    /// anchored at `base_dir`.
    pub fn from_layers<I>(base_dir: &Path, layers: I) -> Result<Self>
    where
        I: IntoIterator<Item = ConfigLayer>,
    {
        let mut config = Config::default();
        for layer in layers {
            config.apply(base_dir, layer)?;
        }
        Ok(config)
    }

    fn apply(&mut self, base_dir: &Path, layer: ConfigLayer) -> Result<()> {
        // Validate before touching any field
        let modules = layer
            .modules
            .as_ref()
            .map(SubsystemFilter::from_names)
            .transpose()?;
        if let Some(output) = &layer.output {
            validate_path("output", output)?;
        }
        if let Some(tree) = &layer.require_tree_output {
            validate_path("require_tree_output", tree)?;
        }

        if let Some(output) = layer.output {
            self.output = Some(base_dir.join(output));
        }
        if let Some(structured) = layer.structured {
            self.structured = structured;
        }
        if let Some(frequency) = layer.frequency {
            self.frequency = frequency;
        }
        if let Some(summary) = layer.summary {
            self.summary = summary;
        }
        if let Some(modules) = modules {
            self.modules = modules;
        }
        if let Some(tree) = layer.require_tree_output {
            self.require_tree_output = Some(base_dir.join(tree));
        }
        if let Some(dependencies) = layer.dependencies {
            self.dependencies = dependencies;
        }
        Ok(())
    }
}

fn validate_path(field: &str, path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(VigiaError::Config(format!("{} should be a non-empty path", field)));
    }
    Ok(())
}
