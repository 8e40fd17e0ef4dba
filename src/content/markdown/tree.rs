//! Owned HTML tree the pipeline stages rewrite

/// Elements serialized without a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// A node in the HTML tree
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    /// Decoded text, escaped on serialization
    Text(String),
    /// Markup emitted verbatim
    Raw(String),
}

/// An element with attributes and children
///
/// Attribute values are held in their serialized (escaped) form, so values
/// copied from author HTML round-trip untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute with a plain (unescaped) value
    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Set an attribute from a plain value, replacing any previous one
    pub fn set_attr(&mut self, name: &str, value: &str) {
        let escaped = escape_attr(value);
        match self.attrs.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = escaped,
            None => self.attrs.push((name.to_string(), escaped)),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        let value = match self.attr("class") {
            Some(existing) if !existing.is_empty() => format!("{} {}", class, existing),
            _ => class.to_string(),
        };
        self.set_attr("class", &value);
    }

    /// The `X` of a `language-X` class
    pub fn language(&self) -> Option<&str> {
        self.classes()
            .find_map(|c| c.strip_prefix("language-"))
            .filter(|l| !l.is_empty())
    }

    /// Concatenated text of all text descendants, `None` if the element holds
    /// raw markup or nested elements beyond plain token spans
    pub fn plain_text(&self) -> Option<String> {
        let mut out = String::new();
        for child in &self.children {
            match child {
                Node::Text(t) => out.push_str(t),
                Node::Element(e) if e.tag == "span" => out.push_str(&e.plain_text()?),
                _ => return None,
            }
        }
        Some(out)
    }

    pub fn push(&mut self, node: Node) {
        self.children.push(node);
    }
}

/// Depth-first, mutable walk over every element of a forest
pub fn walk_elements_mut(nodes: &mut [Node], f: &mut impl FnMut(&mut Element)) {
    for node in nodes.iter_mut() {
        if let Node::Element(el) = node {
            f(el);
            walk_elements_mut(&mut el.children, f);
        }
    }
}

/// Fallible variant of [`walk_elements_mut`]
pub fn try_walk_elements_mut<E>(
    nodes: &mut [Node],
    f: &mut impl FnMut(&mut Element) -> Result<(), E>,
) -> Result<(), E> {
    for node in nodes.iter_mut() {
        if let Node::Element(el) = node {
            f(el)?;
            try_walk_elements_mut(&mut el.children, f)?;
        }
    }
    Ok(())
}

/// Serialize a forest to HTML
pub fn to_html(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(&mut out, node);
    }
    out
}

fn write_node(out: &mut String, node: &Node) {
    match node {
        Node::Text(t) => out.push_str(&escape_text(t)),
        Node::Raw(r) => out.push_str(r),
        Node::Element(el) => {
            out.push('<');
            out.push_str(&el.tag);
            for (name, value) in &el.attrs {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(value);
                out.push('"');
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&el.tag.as_str()) {
                return;
            }
            for child in &el.children {
                write_node(out, child);
            }
            out.push_str("</");
            out.push_str(&el.tag);
            out.push('>');
        }
    }
}

pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Escape text content
pub fn escape_text(s: &str) -> String {
    html_escape::encode_text(s).into_owned()
}

/// Escape an attribute value
pub fn escape_attr(s: &str) -> String {
    html_escape::encode_double_quoted_attribute(s).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_escapes_text_not_raw() {
        let mut p = Element::new("p");
        p.push(Node::Text("a < b & c".to_string()));
        p.push(Node::Raw("<b>bold</b>".to_string()));
        assert_eq!(
            to_html(&[Node::Element(p)]),
            "<p>a &lt; b &amp; c<b>bold</b></p>"
        );
    }

    #[test]
    fn test_void_elements_have_no_close_tag() {
        let img = Element::new("img").with_attr("src", "a.png").with_attr("alt", "\"q\"");
        assert_eq!(
            to_html(&[Node::Element(img)]),
            r#"<img src="a.png" alt="&quot;q&quot;">"#
        );
    }

    #[test]
    fn test_classes_and_language() {
        let mut code = Element::new("code").with_attr("class", "language-java");
        assert_eq!(code.language(), Some("java"));
        code.add_class("hljs");
        code.add_class("hljs");
        assert_eq!(code.attr("class"), Some("hljs language-java"));
        assert_eq!(Element::new("code").language(), None);
    }

    #[test]
    fn test_plain_text_rejects_raw() {
        let mut code = Element::new("code");
        code.push(Node::Text("a".to_string()));
        let mut span = Element::new("span");
        span.push(Node::Text("b".to_string()));
        code.push(Node::Element(span));
        assert_eq!(code.plain_text().as_deref(), Some("ab"));
        code.push(Node::Raw("<i>".to_string()));
        assert_eq!(code.plain_text(), None);
    }
}
