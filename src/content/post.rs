//! Post model

use serde::{Deserialize, Serialize};

use super::frontmatter::{FrontMatter, ParseError};
use super::markdown::MarkdownRenderer;

/// A blog post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Unique, author-supplied identifier
    pub slug: String,

    /// Post title
    pub title: String,

    /// Publication date, as written by the author
    pub date: String,

    /// Post tags, in author order
    pub tags: Vec<String>,

    /// Read from front-matter but neither stored nor returned
    #[serde(skip)]
    pub published: bool,

    /// Rendered HTML content
    pub content: String,
}

impl Post {
    /// Parse a raw front-matter document and render its body
    pub fn parse(data: &[u8], renderer: &MarkdownRenderer) -> Result<Self, ParseError> {
        let text = std::str::from_utf8(data)?;
        let (fm, body) = FrontMatter::parse(text)?;
        Ok(Self::from_parts(fm, renderer.render(body)))
    }

    /// Build a post from decoded front-matter and rendered HTML
    pub fn from_parts(fm: FrontMatter, content: String) -> Self {
        Self {
            slug: fm.slug,
            title: fm.title,
            date: fm.date,
            tags: fm.tags,
            published: fm.published,
            content,
        }
    }
}
