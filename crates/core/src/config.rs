//! Application configuration (`~/.config/releaseboard/config.toml`).
//!
//! Values are layered: built-in defaults, then the config file, then
//! `RELEASEBOARD_*` environment variables.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::feed::FeedSource;

/// Directory under the platform config dir holding `config.toml`.
pub const CONFIG_DIR_NAME: &str = "releaseboard";

const DEFAULT_CONFIG: &str = r#"# Release board configuration.

# Path or http(s) URL of the releases document.
source = "games.json"

# Board columns, left to right. Releases for other platforms are not shown.
platforms = ["sony", "xbox", "nintendo"]

# Reload automatically when a local source file changes.
watch = true

# Cells the want bubble travels per animation tick.
bubble_step = 2.0

# Pin the board to a fixed day instead of the local date.
# today = "2024-01-20"
"#;

/// Runtime configuration for the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path or URL of the releases document.
    #[serde(default = "default_source")]
    pub source: String,
    /// Board columns in display order.
    #[serde(default = "default_platforms")]
    pub platforms: Vec<String>,
    /// Reload when a local source file changes.
    #[serde(default = "default_true")]
    pub watch: bool,
    /// Bubble travel per animation tick, in terminal cells.
    #[serde(default = "default_bubble_step")]
    pub bubble_step: f32,
    /// Fixed day used instead of the local date.
    #[serde(default)]
    pub today: Option<NaiveDate>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            platforms: default_platforms(),
            watch: true,
            bubble_step: default_bubble_step(),
            today: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default location plus environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    /// Load configuration from `path` (optional) plus environment overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let settings = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix("RELEASEBOARD")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("platforms"),
            )
            .build()
            .with_context(|| format!("failed to read configuration {}", path.display()))?;

        settings
            .try_deserialize()
            .with_context(|| format!("failed to parse configuration {}", path.display()))
    }

    /// Day the board is rendered for.
    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    /// Where the releases document is loaded from.
    pub fn feed_source(&self) -> FeedSource {
        FeedSource::parse(&self.source)
    }
}

/// Directory holding the configuration file.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

/// Default configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Write the commented default configuration if none exists yet.
pub fn ensure_default_config() -> Result<PathBuf> {
    let path = config_path();
    write_default_config(&path)?;
    Ok(path)
}

fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write default config {}", path.display()))?;
    info!(path = %path.display(), "Wrote default configuration");
    Ok(())
}

fn default_source() -> String {
    "games.json".to_string()
}

fn default_platforms() -> Vec<String> {
    ["sony", "xbox", "nintendo"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn default_true() -> bool {
    true
}

fn default_bubble_step() -> f32 {
    2.0
}
