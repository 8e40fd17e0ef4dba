//! Post model

use chrono::{DateTime, Datelike, Local};
use indexmap::IndexMap;
use serde::Serialize;

use super::FrontMatter;

/// A published article
#[derive(Debug, Clone, Serialize)]
pub struct Post {
    /// Identity, the source file name without extension
    pub id: String,

    /// Publication date
    pub date: DateTime<Local>,

    /// Post title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Post categories, as written
    pub categories: Vec<String>,

    /// Post tags, as written
    pub tags: Vec<String>,

    /// Author, any YAML value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<serde_yaml::Value>,

    /// Raw markdown body
    #[serde(skip)]
    pub content: String,

    /// Rendered HTML, populated by the markdown pipeline
    #[serde(rename = "contentHtml", skip_serializing_if = "Option::is_none")]
    pub content_html: Option<String>,

    /// Custom front-matter fields
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_yaml::Value>,
}

impl Post {
    /// Build a post from its id, parsed front-matter and body
    ///
    /// Returns `None` when the front-matter carries no parsable date.
    pub fn from_parts(id: String, fm: FrontMatter, body: &str) -> Option<Self> {
        let date = fm.parse_date()?;
        Some(Self {
            id,
            date,
            title: fm.title,
            categories: fm.categories,
            tags: fm.tags,
            author: fm.author,
            content: body.to_string(),
            content_html: None,
            extra: fm.extra,
        })
    }

    /// The author as a string, if it is one
    pub fn author_str(&self) -> Option<&str> {
        match &self.author {
            Some(serde_yaml::Value::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Raw label used to order related posts
    pub fn category_label(&self) -> &str {
        match self.extra.get("category") {
            Some(serde_yaml::Value::String(s)) => s.as_str(),
            _ => self.categories.first().map(String::as_str).unwrap_or(""),
        }
    }

    /// Archive slug, `month-year` with an unpadded month (`3-2025`)
    pub fn archive_slug(&self) -> String {
        format!("{}-{}", self.date.month(), self.date.year())
    }
}

/// Category/tag normalization: lowercase, first space replaced by `-`
///
/// Only the first space is replaced; `"Spring Boot Data"` becomes
/// `"spring-boot data"`.
pub fn label_slug(label: &str) -> String {
    label.to_lowercase().replacen(' ', "-", 1)
}

/// Author normalization: trimmed, lowercased, whitespace runs to `-`
pub fn author_slug(author: &str) -> String {
    author
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(date: &str, categories: &[&str]) -> Post {
        let fm = FrontMatter {
            date: Some(date.to_string()),
            categories: categories.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        };
        Post::from_parts("p".to_string(), fm, "body").unwrap()
    }

    #[test]
    fn test_label_slug_replaces_first_space_only() {
        assert_eq!(label_slug("React"), "react");
        assert_eq!(label_slug("Spring Boot"), "spring-boot");
        assert_eq!(label_slug("Spring Boot Data"), "spring-boot data");
    }

    #[test]
    fn test_author_slug() {
        assert_eq!(author_slug("  Ana   María Pérez "), "ana-maría-pérez");
        assert_eq!(author_slug("Bob"), "bob");
    }

    #[test]
    fn test_missing_date_rejected() {
        let fm = FrontMatter::default();
        assert!(Post::from_parts("x".to_string(), fm, "").is_none());
    }

    #[test]
    fn test_archive_slug() {
        assert_eq!(post("2025-03-09", &[]).archive_slug(), "3-2025");
    }

    #[test]
    fn test_category_label_prefers_category_key() {
        let mut p = post("2025-01-01", &["Backend"]);
        assert_eq!(p.category_label(), "Backend");
        p.extra.insert(
            "category".to_string(),
            serde_yaml::Value::String("Alpha".to_string()),
        );
        assert_eq!(p.category_label(), "Alpha");
        assert_eq!(post("2025-01-01", &[]).category_label(), "");
    }
}
