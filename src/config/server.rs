//! Server configuration (mdpost.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Name of the configuration file looked up in the base directory
pub const CONFIG_FILE: &str = "mdpost.yml";

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    // Network
    pub ip: String,
    pub port: u16,

    // Storage
    pub database: String,
    pub images_dir: String,
    /// Maximum size of an image upload request, in bytes
    pub upload_limit: usize,

    // Rendering
    #[serde(default)]
    pub markdown: MarkdownConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ip: "0.0.0.0".to_string(),
            port: 8082,

            database: "blog.db".to_string(),
            images_dir: "images".to_string(),
            upload_limit: 10 << 20,

            markdown: MarkdownConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: ServerConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Render the configuration as YAML, used by `init`
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Markdown rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownConfig {
    /// Highlight fenced code blocks with syntect
    pub highlight: bool,
    pub line_numbers: bool,
    pub theme: String,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            highlight: false,
            line_numbers: false,
            theme: "base16-ocean.dark".to_string(),
        }
    }
}
