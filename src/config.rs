//! Site configuration module.
//!
//! Handles loading and validating `quillgen.toml`. Config files are
//! sparse — override just the values you want. Unknown keys in the
//! structural sections are rejected to catch typos early; the `[site]`
//! section deliberately accepts arbitrary keys, which flow into template
//! contexts as `site.*`.
//!
//! ## Configuration Options
//!
//! ```toml
//! [options]
//! root = "build"            # Build root: records, index, rendered output
//! source = "content"        # Authored source documents
//!
//! [site]
//! timezone = "UTC"          # Default IANA zone for naive dates
//! title = "My Site"         # Free-form, exposed to templates
//!
//! [item_defaults]
//! # Default Item fields for records that don't set them
//!
//! [markdown]
//! extensions = ["tables", "footnotes", "strikethrough"]
//!
//! [templates]
//! dir = "templates"
//!
//! [templates.formats]
//! rss = ["feed.rss.j2"]     # Extra format -> candidate-template bindings
//!
//! [schema]
//! path = "schemas/Item.json" # Override the embedded record schema
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `quillgen.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Build directory layout.
    pub options: OptionsConfig,
    /// Site-wide values: timezone plus free-form template variables.
    pub site: SiteConfig,
    /// Default `Item` fields applied to records that don't set them.
    pub item_defaults: BTreeMap<String, Value>,
    /// Markup conversion settings.
    pub markdown: MarkdownConfig,
    /// Template engine settings.
    pub templates: TemplatesConfig,
    /// Record schema settings.
    pub schema: SchemaConfig,
}

/// Build directory layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptionsConfig {
    /// Build root: synced sources, records, the index, rendered output.
    pub root: PathBuf,
    /// Authored source directory (read-only to the pipeline).
    pub source: PathBuf,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("build"),
            source: PathBuf::from("content"),
        }
    }
}

/// Site-wide values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// IANA zone name attached to naive dates and used to reconcile
    /// offset-carrying ones.
    pub timezone: String,
    /// Free-form site variables (title, baseurl, ...), passed through to
    /// template contexts.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            extra: BTreeMap::new(),
        }
    }
}

/// Markup conversion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarkdownConfig {
    /// Ordered markup-processor extension identifiers. Recognized:
    /// `tables`, `footnotes`, `strikethrough`, `tasklists`,
    /// `smart-punctuation`, `heading-attributes`. Unknown identifiers
    /// are logged and skipped.
    pub extensions: Vec<String>,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            extensions: vec![
                "tables".to_string(),
                "footnotes".to_string(),
                "strikethrough".to_string(),
            ],
        }
    }
}

/// Template engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplatesConfig {
    /// Template search path; candidate names resolve relative to it.
    pub dir: PathBuf,
    /// Output-format → candidate-template bindings, merged in after the
    /// derived html chain (existing entries win).
    pub formats: BTreeMap<String, Vec<String>>,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("templates"),
            formats: BTreeMap::new(),
        }
    }
}

/// Record schema settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchemaConfig {
    /// Path to a JSON Schema document describing a valid record.
    /// When absent, the embedded schema is used.
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load from a TOML file. A missing file yields the defaults, same
    /// as an empty file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.zone()?;
        if self.options.root == self.options.source {
            return Err(ConfigError::Validation(
                "options.root and options.source must differ".into(),
            ));
        }
        for (format, candidates) in &self.templates.formats {
            if format.is_empty() || candidates.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "templates.formats entry {format:?} must name at least one template"
                )));
            }
        }
        Ok(())
    }

    /// Parse the configured timezone.
    pub fn zone(&self) -> Result<chrono_tz::Tz, ConfigError> {
        self.site.timezone.parse().map_err(|_| {
            ConfigError::Validation(format!("unknown timezone {:?}", self.site.timezone))
        })
    }
}

/// The stock config with all options documented, printed by
/// `quill gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# Quillgen Configuration
# ======================
# All settings are optional. Values shown are the defaults.
# Unknown keys outside [site] and [item_defaults] are errors.

[options]
# Build root: synced sources, records, the index, rendered output
root = "build"
# Authored source documents (never written by the pipeline)
source = "content"

[site]
# Default IANA timezone. Dates without an offset are localized here;
# dates with an offset are converted here.
timezone = "UTC"
# Any other keys in this section are passed to templates as site.*:
# title = "My Site"
# baseurl = "https://example.com"

[item_defaults]
# Default Item fields applied to records that don't set them, e.g.:
# copyright_holder = { role = "author", name = "A. Author" }

[markdown]
# Markup-processor extensions, applied in order. Recognized:
# tables, footnotes, strikethrough, tasklists, smart-punctuation,
# heading-attributes
extensions = ["tables", "footnotes", "strikethrough"]

[templates]
# Directory searched for *.j2 templates
dir = "templates"

[templates.formats]
# Candidate templates for formats other than html. The html chain is
# always derived from the itemtype hierarchy and cannot be overridden.
# rss = ["feed.rss.j2"]

[schema]
# Path to a JSON Schema document for records; omit to use the embedded
# schema.
# path = "schemas/Item.json"
"##
}
