//! Document loader - reads front-matter documents from disk

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::{MarkdownRenderer, Post};

/// Loads post documents from a file or a directory tree
pub struct DocumentLoader<'a> {
    renderer: &'a MarkdownRenderer,
}

impl<'a> DocumentLoader<'a> {
    pub fn new(renderer: &'a MarkdownRenderer) -> Self {
        Self { renderer }
    }

    /// Collect markdown documents below `path` (or `path` itself if it is a file)
    pub fn discover(&self, path: &Path) -> Result<Vec<PathBuf>> {
        if path.is_file() {
            return Ok(vec![path.to_path_buf()]);
        }
        if !path.exists() {
            anyhow::bail!("No such file or directory: {:?}", path);
        }

        let mut files: Vec<PathBuf> = WalkDir::new(path)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|p| p.is_file() && is_markdown_file(p))
            .collect();

        files.sort();
        Ok(files)
    }

    /// Load a single post from a file
    pub fn load(&self, path: &Path) -> Result<Post> {
        let data = fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
        let post = Post::parse(&data, self.renderer)
            .with_context(|| format!("Failed to parse {:?}", path))?;
        Ok(post)
    }
}

/// Check if a file is a markdown file
fn is_markdown_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_lowercase().as_str(), "md" | "markdown"))
        .unwrap_or(false)
}
