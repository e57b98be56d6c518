//! TOML configuration parsing.
//!
//! One file selects the storage backend and carries the server, dashboard
//! and collector settings. Paths are used as written (relative paths are
//! relative to the working directory).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub json: Option<JsonConfig>,
    #[serde(default)]
    pub db: Option<DbConfig>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub collector: Option<CollectorConfig>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Json,
    Sqlite,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Json => write!(f, "json"),
            Backend::Sqlite => write!(f, "sqlite"),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: Backend,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JsonConfig {
    #[serde(default = "default_raw_dir")]
    pub raw_dir: PathBuf,
    #[serde(default = "default_keywords_file")]
    pub keywords_file: PathBuf,
    #[serde(default = "default_highlights_file")]
    pub highlights_file: PathBuf,
}

impl Default for JsonConfig {
    fn default() -> Self {
        Self {
            raw_dir: default_raw_dir(),
            keywords_file: default_keywords_file(),
            highlights_file: default_highlights_file(),
        }
    }
}

fn default_raw_dir() -> PathBuf {
    PathBuf::from("data/raw")
}
fn default_keywords_file() -> PathBuf {
    PathBuf::from("data/keywords.json")
}
fn default_highlights_file() -> PathBuf {
    PathBuf::from("data/highlights.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8501".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

fn default_page_size() -> usize {
    adshelf_core::query::DEFAULT_PAGE_SIZE
}
fn default_max_page_size() -> usize {
    500
}

impl DashboardConfig {
    /// Requested page size, defaulted and clamped to `max_page_size`.
    pub fn effective_page_size(&self, requested: Option<usize>) -> usize {
        match requested {
            Some(0) | None => self.page_size,
            Some(n) => n.min(self.max_page_size),
        }
    }
}

/// External collection process, started per keyword and never awaited.
#[derive(Debug, Deserialize, Clone)]
pub struct CollectorConfig {
    /// Program followed by its arguments; the keyword is appended.
    pub command: Vec<String>,
}

impl Config {
    /// JSON settings, falling back to defaults when `[json]` is omitted.
    pub fn json_or_default(&self) -> JsonConfig {
        self.json.clone().unwrap_or_default()
    }

    /// SQLite path. Only meaningful for the sqlite backend.
    pub fn db_path(&self) -> Result<&Path> {
        self.db
            .as_ref()
            .map(|db| db.path.as_path())
            .ok_or_else(|| anyhow::anyhow!("[db] path must be set when store.backend = \"sqlite\""))
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate dashboard
    if config.dashboard.page_size == 0 {
        anyhow::bail!("dashboard.page_size must be > 0");
    }
    if config.dashboard.page_size > config.dashboard.max_page_size {
        anyhow::bail!(
            "dashboard.page_size ({}) must not exceed dashboard.max_page_size ({})",
            config.dashboard.page_size,
            config.dashboard.max_page_size
        );
    }

    // Validate backend settings
    match config.store.backend {
        Backend::Sqlite => {
            config.db_path()?;
        }
        Backend::Json => {
            let json = config.json_or_default();
            for (key, path) in [
                ("raw_dir", &json.raw_dir),
                ("keywords_file", &json.keywords_file),
                ("highlights_file", &json.highlights_file),
            ] {
                if path.as_os_str().is_empty() {
                    anyhow::bail!("json.{} must not be empty", key);
                }
            }
        }
    }

    if let Some(collector) = &config.collector {
        if collector.command.is_empty() || collector.command[0].trim().is_empty() {
            anyhow::bail!("collector.command must name a program");
        }
    }

    Ok(config)
}
