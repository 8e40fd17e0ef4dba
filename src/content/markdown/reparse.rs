//! Re-parse stage: raw HTML fragments become structural nodes
//!
//! pulldown-cmark hands raw HTML over in pieces (one event per block line or
//! inline tag). A run of siblings that starts with a raw fragment and whose
//! tags balance out is parsed with `tl`; siblings that are already structural
//! travel through the parse as comment placeholders, so fenced code nested in
//! author HTML keeps its shape. Fragments that never balance stay raw.

use lazy_static::lazy_static;
use regex::Regex;

use super::tree::{is_void, Node};

/// Placeholder comment prefix for structural siblings inside a raw run
const PLACEHOLDER: &str = "folio-node:";

lazy_static! {
    static ref TAG: Regex =
        Regex::new(r#"<!--[\s\S]*?-->|<(/?)([A-Za-z][A-Za-z0-9-]*)(?:\s[^<>]*?)?(/?)>"#).unwrap();
}

/// Feed a fragment's tags into an open-element stack
///
/// Returns `false` when a closing tag does not match the innermost open one.
fn feed_tags(stack: &mut Vec<String>, markup: &str) -> bool {
    for caps in TAG.captures_iter(markup) {
        let Some(name) = caps.get(2) else {
            continue; // comment
        };
        let name = name.as_str().to_ascii_lowercase();
        let closing = caps.get(1).is_some_and(|m| m.as_str() == "/");
        let self_closing = caps.get(3).is_some_and(|m| m.as_str() == "/");
        if is_void(&name) {
            continue;
        }
        if closing {
            if stack.pop().as_deref() != Some(name.as_str()) {
                return false;
            }
        } else if !self_closing {
            stack.push(name);
        }
    }
    true
}

/// Re-parse raw fragments throughout a forest
pub fn reparse(nodes: Vec<Node>) -> Vec<Node> {
    let nodes: Vec<Node> = nodes
        .into_iter()
        .map(|node| match node {
            Node::Element(mut el) => {
                el.children = reparse(std::mem::take(&mut el.children));
                Node::Element(el)
            }
            other => other,
        })
        .collect();

    let mut out = Vec::with_capacity(nodes.len());
    let mut i = 0;
    while i < nodes.len() {
        if !matches!(nodes[i], Node::Raw(_)) {
            out.push(nodes[i].clone());
            i += 1;
            continue;
        }
        match balanced_run_end(&nodes, i) {
            Some(end) => {
                out.extend(parse_run(&nodes[i..=end]));
                i = end + 1;
            }
            None => {
                out.push(nodes[i].clone());
                i += 1;
            }
        }
    }
    out
}

/// Index of the first sibling at which the tags opened from `start` close
fn balanced_run_end(nodes: &[Node], start: usize) -> Option<usize> {
    let mut stack = Vec::new();
    for (j, node) in nodes.iter().enumerate().skip(start) {
        if let Node::Raw(markup) = node {
            if !feed_tags(&mut stack, markup) {
                return None;
            }
            if stack.is_empty() {
                return Some(j);
            }
        }
    }
    None
}

/// Parse one balanced run; on any trouble the run comes back unchanged
fn parse_run(run: &[Node]) -> Vec<Node> {
    let mut markup = String::new();
    let mut slots: Vec<Option<Node>> = Vec::new();
    for node in run {
        match node {
            Node::Raw(raw) => markup.push_str(raw),
            other => {
                markup.push_str(&format!("<!--{}{}-->", PLACEHOLDER, slots.len()));
                slots.push(Some(other.clone()));
            }
        }
    }

    let Ok(dom) = tl::parse(&markup, tl::ParserOptions::default()) else {
        tracing::debug!("raw HTML fragment left unparsed");
        return run.to_vec();
    };

    let parser = dom.parser();
    let mut out = Vec::new();
    for handle in dom.children() {
        if let Some(node) = convert(*handle, parser, &mut slots, false) {
            out.push(node);
        }
    }

    if slots.iter().any(Option::is_some) {
        // tl dropped a placeholder; keep the author's markup as it was
        return run.to_vec();
    }
    out
}

/// Elements whose text is emitted without escaping
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Convert a tl node into a tree node
///
/// Text becomes decoded `Node::Text`, except inside `script`/`style`.
fn convert(
    handle: tl::NodeHandle,
    parser: &tl::Parser,
    slots: &mut [Option<Node>],
    raw_text: bool,
) -> Option<Node> {
    match handle.get(parser)? {
        tl::Node::Tag(tag) => {
            let name = tag.name().as_utf8_str().to_lowercase();
            let mut el = super::tree::Element::new(&name);
            for (key, value) in tag.attributes().iter() {
                let key: &str = key.as_ref();
                // Values stay in source form; only the quote we serialize with is escaped
                let value = value
                    .map(|v| v.replace('"', "&quot;"))
                    .unwrap_or_default();
                el.attrs.push((key.to_string(), value));
            }
            let raw_children = RAW_TEXT_ELEMENTS.contains(&name.as_str());
            for child in tag.children().top().iter() {
                if let Some(node) = convert(*child, parser, slots, raw_children) {
                    el.children.push(node);
                }
            }
            Some(Node::Element(el))
        }
        tl::Node::Raw(bytes) => {
            let text = bytes.as_utf8_str();
            if raw_text {
                Some(Node::Raw(text.to_string()))
            } else {
                Some(Node::Text(
                    html_escape::decode_html_entities(text.as_ref()).into_owned(),
                ))
            }
        }
        tl::Node::Comment(bytes) => {
            let text = bytes.as_utf8_str();
            let inner = text
                .trim_start_matches("<!--")
                .trim_end_matches("-->")
                .trim();
            if let Some(slot) = inner
                .strip_prefix(PLACEHOLDER)
                .and_then(|n| n.parse::<usize>().ok())
                .and_then(|n| slots.get_mut(n))
            {
                return slot.take();
            }
            if text.starts_with("<!--") {
                Some(Node::Raw(text.to_string()))
            } else {
                Some(Node::Raw(format!("<!--{}-->", text)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tree::{to_html, Element};
    use super::*;

    fn raw(s: &str) -> Node {
        Node::Raw(s.to_string())
    }

    #[test]
    fn test_balanced_fragment_becomes_elements() {
        let nodes = reparse(vec![raw("<div class=\"note\"><b>hi</b></div>")]);
        let Node::Element(div) = &nodes[0] else {
            panic!("expected element, got {:?}", nodes[0]);
        };
        assert_eq!(div.tag, "div");
        assert_eq!(div.attr("class"), Some("note"));
        assert!(matches!(&div.children[0], Node::Element(b) if b.tag == "b"));
    }

    #[test]
    fn test_inline_run_with_text_between() {
        let nodes = reparse(vec![
            raw("<kbd>"),
            Node::Text("Ctrl".to_string()),
            raw("</kbd>"),
        ]);
        assert_eq!(nodes.len(), 1);
        let Node::Element(kbd) = &nodes[0] else {
            panic!("expected element");
        };
        assert_eq!(kbd.tag, "kbd");
        assert_eq!(kbd.children, vec![Node::Text("Ctrl".to_string())]);
        assert_eq!(to_html(&nodes), "<kbd>Ctrl</kbd>");
    }

    #[test]
    fn test_structural_sibling_survives() {
        let mut code = Element::new("code").with_attr("class", "language-java");
        code.push(Node::Text("int x;\n".to_string()));
        let mut pre = Element::new("pre");
        pre.push(Node::Element(code.clone()));

        let nodes = reparse(vec![
            raw("<details>\n"),
            Node::Element(pre.clone()),
            raw("</details>\n"),
        ]);
        let Node::Element(details) = &nodes[0] else {
            panic!("expected element");
        };
        assert_eq!(details.tag, "details");
        assert!(details.children.contains(&Node::Element(pre)));
    }

    #[test]
    fn test_unbalanced_fragment_stays_raw() {
        let nodes = reparse(vec![raw("<span>"), Node::Text("open".to_string())]);
        assert_eq!(nodes[0], raw("<span>"));
        assert_eq!(to_html(&nodes), "<span>open");
    }

    #[test]
    fn test_text_is_decoded() {
        let nodes = reparse(vec![raw(
            "<pre><code class=\"language-java\">@Entity(name=&quot;x&quot;)\nclass A {}</code></pre>",
        )]);
        let Node::Element(pre) = &nodes[0] else {
            panic!("expected element");
        };
        let Node::Element(code) = &pre.children[0] else {
            panic!("expected code element");
        };
        assert_eq!(
            code.children,
            vec![Node::Text("@Entity(name=\"x\")\nclass A {}".to_string())]
        );
        assert_eq!(code.language(), Some("java"));
    }

    #[test]
    fn test_script_text_stays_raw() {
        let nodes = reparse(vec![raw("<script>if (a < b && c) {}</script>")]);
        assert_eq!(to_html(&nodes), "<script>if (a < b && c) {}</script>");
    }

    #[test]
    fn test_void_and_comment_fragments() {
        let nodes = reparse(vec![raw("<br>"), raw("<!-- note -->")]);
        assert!(matches!(&nodes[0], Node::Element(e) if e.tag == "br"));
        assert!(to_html(&nodes).contains("<!-- note -->"));
    }
}
