//! Initialize a new mdpost site

use anyhow::Result;
use std::fs;
use std::path::Path;

use crate::config::{ServerConfig, CONFIG_FILE};
use crate::MdPost;

/// Initialize a site in the given directory.
///
/// Writes a default `mdpost.yml` (an existing one is kept), creates the
/// image directory and the database schema, and drops a sample document
/// into `posts/` ready for `mdpost import posts`.
pub async fn init_site(target_dir: &Path) -> Result<MdPost> {
    fs::create_dir_all(target_dir)?;

    let config_path = target_dir.join(CONFIG_FILE);
    if config_path.exists() {
        tracing::info!("Keeping existing {:?}", config_path);
    } else {
        let config_content = format!(
            "# mdpost configuration\n\n{}",
            ServerConfig::default().to_yaml()?
        );
        fs::write(&config_path, config_content)?;
    }

    let mdpost = MdPost::new(target_dir)?;
    fs::create_dir_all(&mdpost.images_dir)?;

    let store = mdpost.connect().await?;
    store.close().await;

    let posts_dir = target_dir.join("posts");
    fs::create_dir_all(&posts_dir)?;
    let sample_path = posts_dir.join("hello-world.md");
    if !sample_path.exists() {
        let now = chrono::Local::now();
        let sample_post = format!(
            r#"---
slug: hello-world
title: Hello World
date: {}
tags: [welcome]
published: true
---

Welcome to mdpost! This is your very first post.

## Quick Start

Publish it with:

```bash
$ mdpost import posts
```

or send it to a running server:

```bash
$ curl -X POST --data-binary @posts/hello-world.md http://localhost:8082/posts
```

Math works too: $e^{{i\pi}} + 1 = 0$
"#,
            now.format("%Y-%m-%d")
        );
        fs::write(&sample_path, sample_post)?;
    }

    Ok(mdpost)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::loader::DocumentLoader;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_site_layout() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("blog");

        let mdpost = init_site(&target).await.unwrap();

        assert!(target.join(CONFIG_FILE).exists());
        assert!(mdpost.images_dir.is_dir());
        assert!(mdpost.database_path.exists());

        let renderer = mdpost.renderer();
        let post = DocumentLoader::new(&renderer)
            .load(&target.join("posts/hello-world.md"))
            .unwrap();
        assert_eq!(post.slug, "hello-world");
        assert!(post.content.contains("math math-inline"));
    }

    #[tokio::test]
    async fn test_init_keeps_existing_config() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "port: 9999\n").unwrap();

        let mdpost = init_site(dir.path()).await.unwrap();
        assert_eq!(mdpost.config.port, 9999);
        assert_eq!(
            fs::read_to_string(dir.path().join(CONFIG_FILE)).unwrap(),
            "port: 9999\n"
        );
    }
}
