//! Markdown transform pipeline
//!
//! One post body goes through fixed stages: parse and lower into an HTML
//! tree, re-parse raw HTML fragments, highlight fenced code, run the
//! annotation pass on the target language, then serialize.

mod annotation;
mod highlight;
mod lower;
mod reparse;
pub mod tree;

use thiserror::Error;

pub use highlight::Highlighter;

use crate::config::HighlightConfig;

/// Errors raised by a pipeline stage
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("highlighting `{lang}` failed: {message}")]
    Highlight { lang: String, message: String },
}

/// Markdown to HTML pipeline with syntax highlighting
pub struct MarkdownPipeline {
    highlighter: Highlighter,
    annotation_language: String,
}

impl MarkdownPipeline {
    /// Create a pipeline from highlighting settings
    pub fn new(config: &HighlightConfig) -> Self {
        Self {
            highlighter: Highlighter::new(config.clone()),
            annotation_language: config.annotation_language.clone(),
        }
    }

    /// Render markdown to HTML
    pub fn render(&self, markdown: &str) -> Result<String, PipelineError> {
        let tree = lower::lower(markdown);
        let mut tree = reparse::reparse(tree);
        highlight::highlight_code_blocks(&mut tree, &self.highlighter)?;
        let annotated = annotation::annotate_code_blocks(
            &mut tree,
            &self.annotation_language,
            self.highlighter.class_prefix(),
        );
        if annotated > 0 {
            tracing::trace!("Annotation pass rewrote {} code blocks", annotated);
        }
        Ok(tree::to_html(&tree))
    }
}

impl Default for MarkdownPipeline {
    fn default() -> Self {
        Self::new(&HighlightConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_basic_markdown() {
        let pipeline = MarkdownPipeline::default();
        let html = pipeline.render("# Hello World\n\nThis is a test.").unwrap();
        assert!(html.contains("<h1>Hello World</h1>"));
        assert!(html.contains("<p>This is a test.</p>"));
    }

    #[test]
    fn test_java_annotation_marked() {
        let pipeline = MarkdownPipeline::default();
        let html = pipeline
            .render("```java\n@Entity(name=\"x\")\npublic class User {}\n```\n")
            .unwrap();
        let code_start = html.find("<code").unwrap();
        let code_end = html.find("</code>").unwrap();
        let attr = html.find("<span class=\"hljs-attr\">name</span>=").unwrap();
        let string = html.find("<span class=\"hljs-string\">\"x\"</span>").unwrap();
        assert!(code_start < attr && attr < string && string < code_end);
    }

    #[test]
    fn test_unknown_language_renders_plain() {
        let pipeline = MarkdownPipeline::default();
        let html = pipeline.render("```foobar\nsome <code>\n```\n").unwrap();
        assert_eq!(
            html,
            "<pre><code class=\"language-foobar\">some &lt;code&gt;\n</code></pre>"
        );
    }

    #[test]
    fn test_missing_language_renders_plain() {
        let pipeline = MarkdownPipeline::default();
        let html = pipeline.render("```\nplain\n```\n").unwrap();
        assert_eq!(html, "<pre><code>plain\n</code></pre>");
    }

    #[test]
    fn test_raw_html_passthrough() {
        let pipeline = MarkdownPipeline::default();
        let md = "<div class=\"callout\" data-kind='tip'>Use &nbsp;care</div>\n\nText with <kbd>Ctrl</kbd>.\n";
        let html = pipeline.render(md).unwrap();
        assert!(html.starts_with("<div "));
        assert!(html.contains("class=\"callout\""));
        assert!(html.contains("data-kind=\"tip\""));
        // Entities are decoded; the no-break space is written as the character
        assert!(html.contains("Use \u{a0}care</div>"));
        assert!(html.contains("<kbd>Ctrl</kbd>"));
    }

    #[test]
    fn test_fence_inside_author_html_is_highlighted() {
        let pipeline = MarkdownPipeline::default();
        let md = "<details>\n\n```java\n@Id(name=\"k\")\n```\n\n</details>\n";
        let html = pipeline.render(md).unwrap();
        assert!(html.starts_with("<details>"));
        assert!(html.contains("class=\"hljs language-java\""));
        assert!(html.contains("<span class=\"hljs-attr\">name</span>="));
    }

    #[test]
    fn test_code_written_as_html_is_highlighted() {
        let pipeline = MarkdownPipeline::default();
        let md = "<pre><code class=\"language-java\">@Entity(name=\"x\")\npublic class A {}</code></pre>\n";
        let html = pipeline.render(md).unwrap();
        assert!(html.contains("class=\"hljs language-java\""));
        assert!(html.contains("<span class=\"hljs-meta\">@Entity</span>"));
        assert!(html.contains("<span class=\"hljs-attr\">name</span>="));
        assert!(html.contains("<span class=\"hljs-string\">\"x\"</span>"));
    }

    #[test]
    fn test_named_entities_survive() {
        let pipeline = MarkdownPipeline::default();
        let html = pipeline.render("<p>&copy; 2025 &mdash; A &amp; B</p>\n").unwrap();
        assert_eq!(html.trim_end(), "<p>\u{a9} 2025 \u{2014} A &amp; B</p>");
    }

    #[test]
    fn test_render_is_deterministic() {
        let pipeline = MarkdownPipeline::default();
        let md = "Intro\n\n```json\n{\"a\": 1}\n```\n";
        assert_eq!(pipeline.render(md).unwrap(), pipeline.render(md).unwrap());
    }
}
