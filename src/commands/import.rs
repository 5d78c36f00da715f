//! Import documents from disk into the post store

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::content::loader::DocumentLoader;
use crate::content::MarkdownRenderer;
use crate::store::PostStore;
use crate::MdPost;

/// Outcome of an import run
#[derive(Debug, Default)]
pub struct ImportSummary {
    /// Slugs written, in file order
    pub imported: Vec<String>,
    /// Files that could not be read, parsed or stored
    pub failed: Vec<(PathBuf, String)>,
}

/// Import one document or every markdown file below a directory
pub async fn run(mdpost: &MdPost, path: &Path) -> Result<()> {
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        mdpost.base_dir.join(path)
    };

    let store = mdpost.connect().await?;
    let summary = import_path(&store, &mdpost.renderer(), &path).await?;
    store.close().await;

    for slug in &summary.imported {
        println!("  imported {}", slug);
    }
    for (file, reason) in &summary.failed {
        println!("  failed   {:?}: {}", file, reason);
    }
    println!(
        "Imported {} posts ({} failed)",
        summary.imported.len(),
        summary.failed.len()
    );

    if !summary.failed.is_empty() {
        anyhow::bail!("{} documents could not be imported", summary.failed.len());
    }
    Ok(())
}

/// Parse and upsert every document found at `path`
pub async fn import_path(
    store: &PostStore,
    renderer: &MarkdownRenderer,
    path: &Path,
) -> Result<ImportSummary> {
    let loader = DocumentLoader::new(renderer);
    let files = loader.discover(path)?;
    tracing::info!("Found {} documents in {:?}", files.len(), path);

    let mut summary = ImportSummary::default();
    for file in files {
        let post = match loader.load(&file) {
            Ok(post) => post,
            Err(e) => {
                tracing::warn!("Skipping {:?}: {:#}", file, e);
                summary.failed.push((file, format!("{:#}", e)));
                continue;
            }
        };

        match store.upsert(&post).await {
            Ok(()) => summary.imported.push(post.slug),
            Err(e) => {
                tracing::error!("Failed to save {:?}: {}", file, e);
                summary.failed.push((file, e.to_string()));
            }
        }
    }

    Ok(summary)
}
