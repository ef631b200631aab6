//! Configuration loading for narrative-web.
//!
//! Configuration is loaded from TOML files with environment variable overrides.

use crate::layout::LabelPlacement;
use anyhow::Result;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::f64::consts::PI;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "config.default.toml";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct NarrativeConfig {
    #[serde(default)]
    pub input: InputConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub hover: HoverConfig,

    #[serde(default)]
    pub labels: LabelsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_nodes")]
    pub nodes: String,

    #[serde(default = "default_edges")]
    pub edges: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            nodes: default_nodes(),
            edges: default_edges(),
        }
    }
}

fn default_nodes() -> String {
    "data/nodes.json".to_string()
}

fn default_edges() -> String {
    "data/edges.json".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_directory")]
    pub directory: String,

    #[serde(default = "default_pretty")]
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            pretty: default_pretty(),
        }
    }
}

fn default_directory() -> String {
    "output".to_string()
}

fn default_pretty() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of payloads kept by a builder.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

fn default_capacity() -> usize {
    64
}

#[derive(Debug, Clone, Deserialize)]
pub struct HoverConfig {
    /// Wrap width for ordinary lines, in characters.
    #[serde(default = "default_wrap_width")]
    pub default_width: usize,

    /// Header lines stay on one line up to this many characters.
    #[serde(default = "default_header_width")]
    pub header_width: usize,

    /// Line prefixes treated as headers.
    #[serde(default = "default_headers")]
    pub headers: Vec<String>,

    /// Per-field wrap widths, keyed by field name.
    #[serde(default)]
    pub field_widths: HashMap<String, usize>,
}

impl Default for HoverConfig {
    fn default() -> Self {
        Self {
            default_width: default_wrap_width(),
            header_width: default_header_width(),
            headers: default_headers(),
            field_widths: HashMap::new(),
        }
    }
}

fn default_wrap_width() -> usize {
    200
}

fn default_header_width() -> usize {
    300
}

fn default_headers() -> Vec<String> {
    vec!["Top Emotions:".to_string()]
}

#[derive(Debug, Clone, Deserialize)]
pub struct LabelsConfig {
    /// Angle the label offsets fan out over, in multiples of π.
    #[serde(default = "default_sweep_turns")]
    pub sweep: f64,

    #[serde(default = "default_radius")]
    pub radius: f64,
}

impl Default for LabelsConfig {
    fn default() -> Self {
        Self {
            sweep: default_sweep_turns(),
            radius: default_radius(),
        }
    }
}

fn default_sweep_turns() -> f64 {
    1.2
}

fn default_radius() -> f64 {
    0.27
}

impl LabelsConfig {
    pub fn placement(&self) -> LabelPlacement {
        LabelPlacement {
            sweep: self.sweep * PI,
            radius: self.radius,
        }
    }
}

impl NarrativeConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false))
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix("NARRATIVE_WEB").separator("_"))
            .build()?;

        Ok(Self::from_config(config))
    }

    /// Deserialize a built config, falling back to defaults (with a warning)
    /// when any value has the wrong shape.
    pub fn from_config(config: Config) -> Self {
        config.try_deserialize().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "invalid configuration, using defaults");
            Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn test_defaults() {
        let config = NarrativeConfig::default();
        assert_eq!(config.cache.capacity, 64);
        assert_eq!(config.hover.default_width, 200);
        assert_eq!(config.hover.header_width, 300);
        assert_eq!(config.hover.headers, vec!["Top Emotions:".to_string()]);
        assert_eq!(config.labels.placement(), LabelPlacement::default());
    }

    #[test]
    fn test_values_override_defaults() {
        let config = Config::builder()
            .add_source(File::from_str(
                "[cache]\ncapacity = 8\n[labels]\nradius = 0.5\n",
                FileFormat::Toml,
            ))
            .build()
            .unwrap();
        let config = NarrativeConfig::from_config(config);
        assert_eq!(config.cache.capacity, 8);
        assert_eq!(config.labels.radius, 0.5);
        assert_eq!(config.hover.default_width, 200);
    }

    #[test]
    fn test_invalid_value_falls_back_to_defaults() {
        let config = Config::builder()
            .add_source(File::from_str(
                "[cache]\ncapacity = \"lots\"\n[labels]\nradius = 0.5\n",
                FileFormat::Toml,
            ))
            .build()
            .unwrap();
        let config = NarrativeConfig::from_config(config);
        assert_eq!(config.cache.capacity, 64);
        assert_eq!(config.labels.radius, 0.27);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = NarrativeConfig::load(Path::new("does-not-exist.toml")).unwrap();
        assert_eq!(config.output.directory, "output");
        assert!(config.output.pretty);
    }
}
