//! Content module - front-matter documents, markdown rendering and posts

mod frontmatter;
pub mod loader;
mod markdown;
mod post;

pub use frontmatter::{FrontMatter, ParseError};
pub use markdown::MarkdownRenderer;
pub use post::Post;
