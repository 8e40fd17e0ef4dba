//! Code widget markup: header with language label and copy button, body with
//! line-number gutter and the original `pre`

use super::dom::{Document, NodeId};

pub const COPY_ICON: &str = r#"<svg viewBox="0 0 24 24" width="18" height="18" fill="currentColor" aria-hidden="true"><path d="M16 1H4a2 2 0 0 0-2 2v12h2V3h12V1zm3 4H8a2 2 0 0 0-2 2v14a2 2 0 0 0 2 2h11a2 2 0 0 0 2-2V7a2 2 0 0 0-2-2zm0 16H8V7h11v14z"></path></svg>"#;

pub const CHECK_ICON: &str = r#"<svg viewBox="0 0 24 24" width="18" height="18" fill="currentColor" aria-hidden="true"><path d="M9 16.17 4.83 12l-1.42 1.41L9 19 21 7l-1.41-1.41z"></path></svg>"#;

pub const COPY_TITLE: &str = "Copy";
pub const COPIED_TITLE: &str = "Copied!";

/// Human-readable names for common language tokens
const LANGUAGE_LABELS: &[(&str, &str)] = &[
    ("js", "JavaScript"),
    ("javascript", "JavaScript"),
    ("jsx", "JSX"),
    ("ts", "TypeScript"),
    ("typescript", "TypeScript"),
    ("tsx", "TSX"),
    ("java", "Java"),
    ("kt", "Kotlin"),
    ("kotlin", "Kotlin"),
    ("sh", "Shell"),
    ("shell", "Shell"),
    ("bash", "Bash"),
    ("json", "JSON"),
    ("xml", "XML"),
    ("html", "HTML"),
    ("css", "CSS"),
    ("yml", "YAML"),
    ("yaml", "YAML"),
    ("sql", "SQL"),
    ("py", "Python"),
    ("python", "Python"),
    ("rs", "Rust"),
    ("rust", "Rust"),
    ("go", "Go"),
    ("md", "Markdown"),
    ("markdown", "Markdown"),
    ("text", "Text"),
    ("plaintext", "Text"),
];

/// Label for a language token; unknown tokens are uppercased, none is empty
pub fn language_label(token: Option<&str>) -> String {
    let Some(token) = token.filter(|t| !t.is_empty()) else {
        return String::new();
    };
    let lower = token.to_lowercase();
    LANGUAGE_LABELS
        .iter()
        .find(|(key, _)| *key == lower)
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| token.to_uppercase())
}

/// Number of gutter entries for a block's text
///
/// A final newline ends the last line rather than starting a new one. One
/// leading and one trailing blank line are then ignored; never less than 1.
pub fn line_count(text: &str) -> usize {
    let mut lines: Vec<&str> = text.lines().collect();
    if lines.first().is_some_and(|l| l.trim().is_empty()) {
        lines.remove(0);
    }
    if lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    lines.len().max(1)
}

/// Language token from a `language-X` class on `code` (or its `pre`)
pub fn language_token(doc: &Document, pre: NodeId, code: NodeId) -> Option<String> {
    [code, pre].iter().find_map(|node| {
        doc.attr(*node, "class")?
            .split_whitespace()
            .find_map(|c| c.strip_prefix("language-"))
            .filter(|lang| !lang.is_empty())
            .map(str::to_string)
    })
}

/// Nodes of a built widget
#[derive(Debug, Clone, Copy)]
pub struct Widget {
    pub root: NodeId,
    pub button: NodeId,
}

/// Wrap `pre` in a widget, in place
///
/// `pre` must have a parent; it is moved into the widget body unchanged.
pub fn wrap(doc: &mut Document, pre: NodeId, code: NodeId) -> Option<Widget> {
    let parent = doc.parent(pre)?;
    let token = language_token(doc, pre, code);
    let lines = line_count(&doc.text_content(code));

    let root = doc.create_element("div");
    doc.set_attr(root, "class", "code-block");
    if let Some(token) = &token {
        doc.set_attr(root, "data-language", token);
    }

    let header = doc.create_element("div");
    doc.set_attr(header, "class", "code-header");
    let label = doc.create_element("span");
    doc.set_attr(label, "class", "code-lang");
    let label_text = doc.create_text(&language_label(token.as_deref()));
    doc.append_child(label, label_text);
    doc.append_child(header, label);

    let button = doc.create_element("button");
    doc.set_attr(button, "class", "copy-btn");
    doc.set_attr(button, "type", "button");
    doc.set_attr(button, "aria-label", "Copy code");
    doc.set_attr(button, "title", COPY_TITLE);
    doc.append_html(button, COPY_ICON);
    doc.append_child(header, button);
    doc.append_child(root, header);

    let body = doc.create_element("div");
    doc.set_attr(body, "class", "code-body");
    let gutter = doc.create_element("div");
    doc.set_attr(gutter, "class", "line-numbers");
    doc.set_attr(gutter, "aria-hidden", "true");
    for n in 1..=lines {
        let span = doc.create_element("span");
        let text = doc.create_text(&n.to_string());
        doc.append_child(span, text);
        doc.append_child(gutter, span);
    }
    doc.append_child(body, gutter);
    doc.append_child(root, body);

    doc.insert_before(parent, root, pre);
    doc.append_child(body, pre);

    Some(Widget { root, button })
}
