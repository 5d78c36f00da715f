//! List stored posts

use anyhow::Result;

use crate::content::Post;
use crate::MdPost;

/// Print every post in the store
pub async fn run(mdpost: &MdPost) -> Result<()> {
    let store = mdpost.connect().await?;
    let posts = store.list().await?;
    store.close().await;

    println!("Posts ({}):", posts.len());
    for post in &posts {
        println!("{}", format_post(post));
    }

    Ok(())
}

fn format_post(post: &Post) -> String {
    let mut line = format!("  {} - {} [{}]", post.date, post.title, post.slug);
    if !post.tags.is_empty() {
        line.push_str(&format!(" ({})", post.tags.join(", ")));
    }
    line
}
