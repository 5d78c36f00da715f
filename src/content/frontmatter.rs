//! Front-matter parsing

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Separator between the preamble, the metadata block and the body
pub const DELIMITER: &str = "---";

/// Errors raised while turning a raw document into a post
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("document is not valid UTF-8")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("malformed document: expected front-matter between two '---' separators")]
    MissingDelimiters,

    #[error("invalid front-matter: {0}")]
    Metadata(#[from] serde_yaml::Error),

    #[error("front-matter must define a non-empty slug")]
    MissingSlug,
}

/// Custom deserializer that handles both a single string and a list of strings
fn string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, SeqAccess, Visitor};
    use std::fmt;

    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![value.to_string()])
        }

        fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![value])
        }

        fn visit_seq<S>(self, mut seq: S) -> Result<Self::Value, S::Error>
        where
            S: SeqAccess<'de>,
        {
            let mut vec = Vec::new();
            while let Some(item) = seq.next_element::<String>()? {
                vec.push(item);
            }
            Ok(vec)
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_any(StringOrVec)
}

/// YAML null (`~` or an empty value) reads as an empty string
fn string_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Metadata block of a post document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontMatter {
    pub slug: String,
    #[serde(deserialize_with = "string_or_null", default)]
    pub title: String,
    /// Kept verbatim, never parsed as a date
    #[serde(deserialize_with = "string_or_null", default)]
    pub date: String,
    #[serde(deserialize_with = "string_or_vec", default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub published: bool,
}

impl FrontMatter {
    /// Parse a document into its front-matter and markdown body.
    ///
    /// The text is split on `---` into at most three segments: a preamble
    /// (ignored), the YAML metadata and the body. Further separators belong
    /// to the body.
    pub fn parse(content: &str) -> Result<(Self, &str), ParseError> {
        let (yaml_content, body) = split(content)?;

        if yaml_content.trim().is_empty() {
            return Err(ParseError::MissingSlug);
        }

        let fm: FrontMatter = serde_yaml::from_str(yaml_content)?;
        if fm.slug.trim().is_empty() {
            return Err(ParseError::MissingSlug);
        }

        Ok((fm, body))
    }
}

/// Split a document into (metadata, body)
fn split(content: &str) -> Result<(&str, &str), ParseError> {
    let mut segments = content.splitn(3, DELIMITER);
    let _preamble = segments.next();
    match (segments.next(), segments.next()) {
        (Some(metadata), Some(body)) => Ok((metadata, body)),
        _ => Err(ParseError::MissingDelimiters),
    }
}
