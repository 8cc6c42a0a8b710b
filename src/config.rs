//! Configuration management with TOML, environment variables, and CLI overrides.

use crate::feed::PageSizePolicy;
use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Application configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the catalog API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Proxy URL (e.g., socks5://host:port)
    #[serde(default)]
    pub proxy: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Page size of the first request after a reset
    #[serde(default = "default_initial_page_size")]
    pub initial_page_size: u32,

    /// Page size of every later request
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Rows below the viewport at which the next page is requested
    #[serde(default = "default_prefetch_rows")]
    pub prefetch_rows: usize,

    /// Rows shown per screen in browse mode
    #[serde(default = "default_viewport_rows")]
    pub viewport_rows: usize,

    /// Site that hosts original product images
    #[serde(default = "default_original_site_url")]
    pub original_site_url: String,

    /// Image service used when no product image loads
    #[serde(default = "default_placeholder_url")]
    pub placeholder_url: String,

    /// Output format
    #[serde(default)]
    pub format: OutputFormat,
}

fn default_api_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_initial_page_size() -> u32 {
    20
}

fn default_page_size() -> u32 {
    10
}

fn default_prefetch_rows() -> usize {
    3
}

fn default_viewport_rows() -> usize {
    10
}

fn default_original_site_url() -> String {
    "https://www.tooriistamaailm.ee".to_string()
}

fn default_placeholder_url() -> String {
    "https://placehold.co/300x200/f8fafc/64748b/png".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            proxy: None,
            timeout_secs: default_timeout_secs(),
            initial_page_size: default_initial_page_size(),
            page_size: default_page_size(),
            prefetch_rows: default_prefetch_rows(),
            viewport_rows: default_viewport_rows(),
            original_site_url: default_original_site_url(),
            placeholder_url: default_placeholder_url(),
            format: OutputFormat::Table,
        }
    }
}

impl Config {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Page sizes used by the feed.
    pub fn page_policy(&self) -> PageSizePolicy {
        PageSizePolicy::new(self.initial_page_size, self.page_size)
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Loads configuration with fallback to default locations.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        let local_config = Path::new("config.toml");
        if local_config.exists() {
            debug!("Found config.toml in current directory");
            return Self::from_file(local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("catalog-feed").join("config.toml");
            if user_config.exists() {
                debug!("Found config in user config directory");
                return Self::from_file(user_config);
            }
        }

        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Applies environment variable overrides. Unparseable values are ignored.
    pub fn with_env(mut self) -> Self {
        if let Ok(api_url) = std::env::var("CATALOG_API_URL") {
            if !api_url.trim().is_empty() {
                self.api_url = api_url;
            }
        }

        if let Ok(proxy) = std::env::var("CATALOG_PROXY") {
            self.proxy = Some(proxy);
        }

        if let Ok(timeout) = std::env::var("CATALOG_TIMEOUT") {
            if let Ok(t) = timeout.parse() {
                self.timeout_secs = t;
            }
        }

        if let Ok(format) = std::env::var("CATALOG_FORMAT") {
            match format.parse() {
                Ok(format) => self.format = format,
                Err(e) => warn!("Ignoring CATALOG_FORMAT: {}", e),
            }
        }

        self
    }
}

/// How command output is rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Aligned columns for the terminal
    #[default]
    Table,
    /// JSON array of products
    Json,
    /// Markdown table
    Markdown,
    /// Comma-separated rows with a header
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s.trim(), true).map_err(|_| {
            let names: Vec<String> =
                Self::value_variants().iter().map(ToString::to_string).collect();
            format!("'{}' is not an output format (expected {})", s, names.join(" | "))
        })
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_possible_value() {
            Some(value) => f.write_str(value.get_name()),
            None => Ok(()),
        }
    }
}
