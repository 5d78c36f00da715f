//! mdpost: a small markdown blog backend
//!
//! Posts are written as markdown documents with YAML front-matter, rendered
//! to HTML on ingestion, stored in SQLite keyed by slug and served over a
//! REST API together with uploaded images.

pub mod commands;
pub mod config;
pub mod content;
pub mod server;
pub mod store;

use anyhow::Result;
use std::path::Path;

/// The main mdpost application
#[derive(Clone)]
pub struct MdPost {
    /// Server configuration
    pub config: config::ServerConfig,
    /// Base directory
    pub base_dir: std::path::PathBuf,
    /// SQLite database file
    pub database_path: std::path::PathBuf,
    /// Image upload directory
    pub images_dir: std::path::PathBuf,
}

impl MdPost {
    /// Create a new instance from a directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join(config::CONFIG_FILE);

        let config = if config_path.exists() {
            config::ServerConfig::load(&config_path)?
        } else {
            config::ServerConfig::default()
        };

        Ok(Self::with_config(base_dir, config))
    }

    /// Create an instance with an explicit configuration
    pub fn with_config<P: AsRef<Path>>(base_dir: P, config: config::ServerConfig) -> Self {
        let base_dir = base_dir.as_ref().to_path_buf();
        let database_path = base_dir.join(&config.database);
        let images_dir = base_dir.join(&config.images_dir);

        Self {
            config,
            base_dir,
            database_path,
            images_dir,
        }
    }

    /// Open the post store, creating the schema if needed
    pub async fn connect(&self) -> Result<store::PostStore> {
        Ok(store::PostStore::connect(&self.database_path).await?)
    }

    /// Markdown renderer configured for this site
    pub fn renderer(&self) -> content::MarkdownRenderer {
        content::MarkdownRenderer::from_config(&self.config.markdown)
    }
}
