//! Site configuration (_config.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub author: String,

    // Directory
    /// Directory holding the post markdown files
    pub posts_dir: String,
    /// Directory the snapshot artifact is written to
    pub snapshot_dir: String,
    /// Directory rendered post fragments are written to
    pub public_dir: String,

    // Listing
    pub per_page: usize,

    /// Worker threads used for batch rendering (0 = available parallelism)
    pub jobs: usize,

    #[serde(default)]
    pub highlight: HighlightConfig,

    // Store any additional fields
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Folio".to_string(),
            author: String::new(),

            posts_dir: "src/data/posts".to_string(),
            snapshot_dir: "src/data/.json".to_string(),
            public_dir: "public".to_string(),

            per_page: 10,
            jobs: 0,

            highlight: HighlightConfig::default(),
            extra: HashMap::new(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }
}

/// Code highlighting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    pub enable: bool,
    /// Fence tags that are highlighted; anything else renders plain
    pub languages: Vec<String>,
    /// Language whose code blocks get the annotation pass
    pub annotation_language: String,
    /// Prefix for token classes (`hljs-keyword`, `hljs-string`, ...)
    pub class_prefix: String,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            enable: true,
            languages: [
                "java",
                "kotlin",
                "bash",
                "javascript",
                "typescript",
                "json",
                "xml",
                "yaml",
                "sql",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            annotation_language: "java".to_string(),
            class_prefix: "hljs-".to_string(),
        }
    }
}

impl HighlightConfig {
    /// Whether a fence tag is on the allow-list
    pub fn allows(&self, lang: &str) -> bool {
        self.enable && self.languages.iter().any(|l| l.eq_ignore_ascii_case(lang))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SiteConfig::default();
        assert_eq!(config.posts_dir, "src/data/posts");
        assert_eq!(config.per_page, 10);
        assert!(config.highlight.allows("java"));
        assert!(config.highlight.allows("SQL"));
        assert!(!config.highlight.allows("foobar"));
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
title: My Articles
posts_dir: content/posts
per_page: 4
highlight:
  languages: [rust, java]
  annotation_language: java
analytics: plausible
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.title, "My Articles");
        assert_eq!(config.posts_dir, "content/posts");
        assert_eq!(config.per_page, 4);
        assert!(config.highlight.allows("rust"));
        assert!(!config.highlight.allows("bash"));
        assert_eq!(config.highlight.class_prefix, "hljs-");
        assert!(config.extra.contains_key("analytics"));
    }

    #[test]
    fn test_highlight_disabled() {
        let config = HighlightConfig {
            enable: false,
            ..Default::default()
        };
        assert!(!config.allows("java"));
    }
}
