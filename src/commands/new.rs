//! Create a new post document

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

use crate::MdPost;

/// Write a front-matter scaffold for a new post and return its path.
///
/// The slug defaults to the slugified title; the file lands in `output`
/// (default: `<base>/posts`) as `<slug>.md`.
pub fn create_post(
    mdpost: &MdPost,
    title: &str,
    slug: Option<&str>,
    output: Option<&Path>,
) -> Result<PathBuf> {
    let now = chrono::Local::now();

    let slug = match slug {
        Some(s) => s.to_string(),
        None => slug::slugify(title),
    };
    if slug.is_empty() {
        anyhow::bail!("Cannot derive a slug from title {:?}; pass --slug", title);
    }

    let target_dir = match output {
        Some(dir) if dir.is_absolute() => dir.to_path_buf(),
        Some(dir) => mdpost.base_dir.join(dir),
        None => mdpost.base_dir.join("posts"),
    };
    fs::create_dir_all(&target_dir)?;

    let file_path = target_dir.join(format!("{}.md", slug));
    if file_path.exists() {
        anyhow::bail!("File already exists: {:?}", file_path);
    }

    let content = format!(
        "---\nslug: {}\ntitle: {}\ndate: {}\ntags: []\npublished: false\n---\n\n",
        slug,
        yaml_string(title),
        now.format("%Y-%m-%d")
    );
    fs::write(&file_path, content)?;

    println!("Created: {:?}", file_path);

    Ok(file_path)
}

/// Quote a title so YAML reads it back verbatim
fn yaml_string(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}
