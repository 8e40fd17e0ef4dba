//! Annotation pass: secondary highlighting for `@Name(key = "value")`
//!
//! The argument list ends at the first `)`. Nested parentheses and escaped
//! quotes inside it are not supported.

use lazy_static::lazy_static;
use regex::Regex;

use super::tree::{escape_text, Element, Node};

lazy_static! {
    static ref ANNOTATION: Regex = Regex::new(r"(@[\w.]+)(\s*)\(([^)]*)\)").unwrap();
    static ref ATTR: Regex = Regex::new(r"\b([a-zA-Z_]\w*)(\s*)=").unwrap();
    static ref STRING: Regex = Regex::new(r#""[^"]*""#).unwrap();
}

/// One located annotation and its rewritten markup
struct Rewrite {
    start: usize,
    end: usize,
    markup: String,
}

/// Rewrite the annotations of one code element in place
///
/// Returns `false` and leaves the element untouched when its payload is not
/// plain token text or holds no annotation.
pub fn annotate(code: &mut Element, prefix: &str) -> bool {
    let Some(text) = code.plain_text() else {
        return false;
    };
    let rewrites: Vec<Rewrite> = ANNOTATION
        .captures_iter(&text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(Rewrite {
                start: whole.start(),
                end: whole.end(),
                markup: format!(
                    r#"<span class="{p}meta">{}</span>{}({})"#,
                    escape_text(&caps[1]),
                    &caps[2],
                    rewrite_arguments(&caps[3], prefix),
                    p = prefix,
                ),
            })
        })
        .collect();
    if rewrites.is_empty() {
        return false;
    }

    let mut out = Vec::new();
    let mut offset = 0;
    let mut pending = rewrites.iter().peekable();

    for (class, token) in flatten_tokens(code) {
        let token_start = offset;
        let token_end = offset + token.len();
        offset = token_end;

        let mut cursor = token_start;
        while cursor < token_end {
            match pending.peek() {
                Some(rw) if rw.end <= cursor => {
                    pending.next();
                }
                Some(rw) if rw.start <= cursor => {
                    if rw.start == cursor {
                        out.push(Node::Raw(rw.markup.clone()));
                    }
                    cursor = rw.end.min(token_end);
                }
                Some(rw) => {
                    let stop = rw.start.min(token_end);
                    push_slice(&mut out, class.as_deref(), &token[cursor - token_start..stop - token_start]);
                    cursor = stop;
                }
                None => {
                    push_slice(&mut out, class.as_deref(), &token[cursor - token_start..]);
                    cursor = token_end;
                }
            }
        }
    }

    code.children = out;
    true
}

/// Mark attribute names, then string literals in the text between them
fn rewrite_arguments(args: &str, prefix: &str) -> String {
    let mut out = String::new();
    let mut last = 0;
    for caps in ATTR.captures_iter(args) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        out.push_str(&mark_strings(&args[last..whole.start()], prefix));
        out.push_str(&format!(
            r#"<span class="{}attr">{}</span>{}="#,
            prefix, &caps[1], &caps[2]
        ));
        last = whole.end();
    }
    out.push_str(&mark_strings(&args[last..], prefix));
    out
}

fn mark_strings(text: &str, prefix: &str) -> String {
    let mut out = String::new();
    let mut last = 0;
    for m in STRING.find_iter(text) {
        out.push_str(&escape_text(&text[last..m.start()]));
        out.push_str(&format!(
            r#"<span class="{}string">{}</span>"#,
            prefix,
            escape_text(m.as_str())
        ));
        last = m.end();
    }
    out.push_str(&escape_text(&text[last..]));
    out
}

/// The code element's children as (serialized class, text) tokens
fn flatten_tokens(code: &Element) -> Vec<(Option<String>, String)> {
    code.children
        .iter()
        .filter_map(|child| match child {
            Node::Text(t) => Some((None, t.clone())),
            Node::Element(span) => Some((
                span.attr("class").map(str::to_string),
                span.plain_text().unwrap_or_default(),
            )),
            Node::Raw(_) => None,
        })
        .filter(|(_, text)| !text.is_empty())
        .collect()
}

fn push_slice(out: &mut Vec<Node>, class: Option<&str>, text: &str) {
    if text.is_empty() {
        return;
    }
    match class {
        Some(class) => {
            let mut span = Element::new("span");
            span.attrs.push(("class".to_string(), class.to_string()));
            span.push(Node::Text(text.to_string()));
            out.push(Node::Element(span));
        }
        None => out.push(Node::Text(text.to_string())),
    }
}

/// Run the annotation pass over every code element of the target language
pub fn annotate_code_blocks(nodes: &mut [Node], language: &str, prefix: &str) -> usize {
    let mut rewritten = 0;
    super::tree::walk_elements_mut(nodes, &mut |el: &mut Element| {
        if el.tag == "code"
            && el
                .language()
                .is_some_and(|l| l.eq_ignore_ascii_case(language))
            && annotate(el, prefix)
        {
            rewritten += 1;
        }
    });
    rewritten
}

#[cfg(test)]
mod tests {
    use super::super::tree::to_html;
    use super::*;

    fn code(children: Vec<Node>) -> Element {
        let mut el = Element::new("code").with_attr("class", "language-java");
        el.children = children;
        el
    }

    fn span(class: &str, text: &str) -> Node {
        let mut s = Element::new("span").with_attr("class", class);
        s.push(Node::Text(text.to_string()));
        Node::Element(s)
    }

    fn inner_html(el: &Element) -> String {
        to_html(&el.children)
    }

    #[test]
    fn test_plain_payload_rewritten() {
        let mut el = code(vec![Node::Text("@Entity(name=\"x\")\n".to_string())]);
        assert!(annotate(&mut el, "hljs-"));
        assert_eq!(
            inner_html(&el),
            "<span class=\"hljs-meta\">@Entity</span>(<span class=\"hljs-attr\">name</span>=<span class=\"hljs-string\">\"x\"</span>)\n"
        );
    }

    #[test]
    fn test_tokens_outside_match_keep_highlighting() {
        let mut el = code(vec![
            span("hljs-keyword", "public"),
            Node::Text(" ".to_string()),
            span("hljs-meta", "@Column"),
            Node::Text("(length = 20) ".to_string()),
            span("hljs-type", "String"),
        ]);
        assert!(annotate(&mut el, "hljs-"));
        assert_eq!(
            inner_html(&el),
            "<span class=\"hljs-keyword\">public</span> <span class=\"hljs-meta\">@Column</span>(<span class=\"hljs-attr\">length</span> = 20) <span class=\"hljs-type\">String</span>"
        );
    }

    #[test]
    fn test_dotted_name_and_multiple_attributes() {
        let mut el = code(vec![Node::Text(
            "@javax.persistence.Table(name = \"users\", schema=\"app\")".to_string(),
        )]);
        assert!(annotate(&mut el, "hljs-"));
        let html = inner_html(&el);
        assert!(html.contains("<span class=\"hljs-meta\">@javax.persistence.Table</span>"));
        assert!(html.contains("<span class=\"hljs-attr\">name</span> ="));
        assert!(html.contains("<span class=\"hljs-attr\">schema</span>="));
        assert!(html.contains("<span class=\"hljs-string\">\"users\"</span>"));
        assert!(html.contains("<span class=\"hljs-string\">\"app\"</span>"));
    }

    #[test]
    fn test_attribute_inside_string_wins() {
        // Attribute marking runs first; the literal around it is left unmarked
        let out = rewrite_arguments("value=\"a=b\"", "hljs-");
        assert_eq!(
            out,
            "<span class=\"hljs-attr\">value</span>=\"<span class=\"hljs-attr\">a</span>=b\""
        );
    }

    #[test]
    fn test_no_annotation_passes_through() {
        let original = vec![span("hljs-keyword", "int"), Node::Text(" x = 1;".to_string())];
        let mut el = code(original.clone());
        assert!(!annotate(&mut el, "hljs-"));
        assert_eq!(el.children, original);
    }

    #[test]
    fn test_text_is_escaped() {
        let mut el = code(vec![Node::Text("@Check(expr=\"a<b\") x<y".to_string())]);
        assert!(annotate(&mut el, "hljs-"));
        let html = inner_html(&el);
        assert!(html.contains("<span class=\"hljs-string\">\"a&lt;b\"</span>"));
        assert!(html.ends_with(" x&lt;y"));
    }

    #[test]
    fn test_only_target_language_annotated() {
        let mut kotlin = Element::new("code").with_attr("class", "language-kotlin");
        kotlin.push(Node::Text("@Entity(name=\"x\")".to_string()));
        let mut nodes = vec![Node::Element(kotlin), Node::Element(code(vec![Node::Text("@Id()".to_string())]))];
        assert_eq!(annotate_code_blocks(&mut nodes, "java", "hljs-"), 1);
        assert!(matches!(&nodes[0], Node::Element(e) if e.children.len() == 1 && matches!(e.children[0], Node::Text(_))));
    }
}
