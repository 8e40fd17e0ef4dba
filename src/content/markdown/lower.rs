//! Parse and lower stages: markdown events into the HTML tree

use lazy_static::lazy_static;
use pulldown_cmark::{Alignment, CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag};
use regex::Regex;

use super::tree::{Element, Node};

lazy_static! {
    /// Bare URL in running text (GFM autolink literal)
    static ref BARE_URL: Regex =
        Regex::new(r#"https?://[^\s<>"]*[^\s<>".,:;!?')\]]"#).unwrap();
}

/// Markdown extensions used by the pipeline
pub fn options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_GFM
}

/// Stack frame for an open construct
enum Frame {
    Element(Element),
    /// HTML blocks and metadata add no wrapper of their own
    Transparent,
    Image {
        src: String,
        title: String,
        alt: String,
    },
    CodeBlock {
        lang: Option<String>,
        text: String,
    },
}

/// Lowers pulldown-cmark events into an owned tree
struct Lowering {
    stack: Vec<Frame>,
    root: Vec<Node>,
    table_alignments: Vec<Alignment>,
    in_table_head: bool,
    cell_index: usize,
    link_depth: usize,
}

impl Lowering {
    fn new() -> Self {
        Self {
            stack: Vec::new(),
            root: Vec::new(),
            table_alignments: Vec::new(),
            in_table_head: false,
            cell_index: 0,
            link_depth: 0,
        }
    }

    fn run(mut self, markdown: &str) -> Vec<Node> {
        for event in Parser::new_ext(markdown, options()) {
            self.handle_event(event);
        }
        // Unbalanced input cannot come out of pulldown-cmark, but close anyway
        while !self.stack.is_empty() {
            self.end_tag();
        }
        self.root
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(_) => self.end_tag(),
            Event::Text(text) => self.add_text(&text),
            Event::Code(code) => {
                if self.push_alt(&code) {
                    return;
                }
                let mut el = Element::new("code");
                el.push(Node::Text(code.to_string()));
                self.add_node(Node::Element(el));
            }
            Event::Html(html) | Event::InlineHtml(html) => {
                if !self.in_image() {
                    self.add_node(Node::Raw(html.to_string()));
                }
            }
            Event::SoftBreak => self.add_text("\n"),
            Event::HardBreak => {
                self.add_node(Node::Element(Element::new("br")));
                self.add_node(Node::Text("\n".to_string()));
            }
            Event::Rule => self.add_node(Node::Element(Element::new("hr"))),
            Event::FootnoteReference(name) => {
                let mut link = Element::new("a")
                    .with_attr("href", &format!("#fn-{}", name))
                    .with_attr("id", &format!("fnref-{}", name));
                link.push(Node::Text(format!("[{}]", name)));
                let mut sup = Element::new("sup").with_attr("class", "footnote-ref");
                sup.push(Node::Element(link));
                self.add_node(Node::Element(sup));
            }
            Event::TaskListMarker(checked) => {
                let mut input = Element::new("input")
                    .with_attr("type", "checkbox")
                    .with_attr("disabled", "");
                if checked {
                    input.set_attr("checked", "");
                }
                self.add_node(Node::Element(input));
            }
            _ => {}
        }
    }

    fn start_tag(&mut self, tag: Tag) {
        if self.in_image() {
            // Only the text of nested constructs reaches the alt attribute
            self.stack.push(Frame::Transparent);
            return;
        }

        let frame = match tag {
            Tag::Paragraph => Frame::Element(Element::new("p")),
            Tag::Heading { level, id, .. } => {
                let mut el = Element::new(heading_tag(level));
                if let Some(id) = id {
                    el.set_attr("id", &id);
                }
                Frame::Element(el)
            }
            Tag::BlockQuote { .. } => Frame::Element(Element::new("blockquote")),
            Tag::CodeBlock(kind) => {
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .map(|l| l.to_string()),
                    CodeBlockKind::Indented => None,
                };
                Frame::CodeBlock {
                    lang,
                    text: String::new(),
                }
            }
            Tag::HtmlBlock | Tag::MetadataBlock { .. } => Frame::Transparent,
            Tag::List(Some(1)) => Frame::Element(Element::new("ol")),
            Tag::List(Some(start)) => {
                Frame::Element(Element::new("ol").with_attr("start", &start.to_string()))
            }
            Tag::List(None) => Frame::Element(Element::new("ul")),
            Tag::Item => Frame::Element(Element::new("li")),
            Tag::FootnoteDefinition(name) => Frame::Element(
                Element::new("div")
                    .with_attr("class", "footnote")
                    .with_attr("id", &format!("fn-{}", name)),
            ),
            Tag::Table(alignments) => {
                self.table_alignments = alignments;
                Frame::Element(Element::new("table"))
            }
            Tag::TableHead => {
                self.in_table_head = true;
                self.cell_index = 0;
                Frame::Element(Element::new("thead"))
            }
            Tag::TableRow => {
                self.cell_index = 0;
                Frame::Element(Element::new("tr"))
            }
            Tag::TableCell => {
                let mut el = Element::new(if self.in_table_head { "th" } else { "td" });
                let align = match self.table_alignments.get(self.cell_index) {
                    Some(Alignment::Left) => Some("left"),
                    Some(Alignment::Center) => Some("center"),
                    Some(Alignment::Right) => Some("right"),
                    _ => None,
                };
                if let Some(align) = align {
                    el.set_attr("style", &format!("text-align: {}", align));
                }
                self.cell_index += 1;
                Frame::Element(el)
            }
            Tag::Emphasis => Frame::Element(Element::new("em")),
            Tag::Strong => Frame::Element(Element::new("strong")),
            Tag::Strikethrough => Frame::Element(Element::new("del")),
            Tag::Link {
                dest_url, title, ..
            } => {
                let mut el = Element::new("a").with_attr("href", &dest_url);
                if !title.is_empty() {
                    el.set_attr("title", &title);
                }
                self.link_depth += 1;
                Frame::Element(el)
            }
            Tag::Image {
                dest_url, title, ..
            } => Frame::Image {
                src: dest_url.to_string(),
                title: title.to_string(),
                alt: String::new(),
            },
            _ => Frame::Transparent,
        };
        self.stack.push(frame);
    }

    fn end_tag(&mut self) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        match frame {
            Frame::Transparent => {}
            Frame::Image { src, title, alt } => {
                let mut img = Element::new("img").with_attr("src", &src).with_attr("alt", &alt);
                if !title.is_empty() {
                    img.set_attr("title", &title);
                }
                self.add_node(Node::Element(img));
            }
            Frame::CodeBlock { lang, text } => {
                let mut code = Element::new("code");
                if let Some(lang) = lang {
                    code.set_attr("class", &format!("language-{}", lang));
                }
                code.push(Node::Text(text));
                let mut pre = Element::new("pre");
                pre.push(Node::Element(code));
                self.add_node(Node::Element(pre));
            }
            Frame::Element(mut el) => {
                match el.tag.as_str() {
                    "a" => self.link_depth = self.link_depth.saturating_sub(1),
                    "thead" => {
                        self.in_table_head = false;
                        let mut row = Element::new("tr");
                        row.children = std::mem::take(&mut el.children);
                        el.push(Node::Element(row));
                    }
                    "table" => {
                        let mut body = Element::new("tbody");
                        let mut kept = Vec::new();
                        for child in std::mem::take(&mut el.children) {
                            match child {
                                Node::Element(ref c) if c.tag == "tr" => body.push(child),
                                other => kept.push(other),
                            }
                        }
                        if !body.children.is_empty() {
                            kept.push(Node::Element(body));
                        }
                        el.children = kept;
                        self.table_alignments.clear();
                    }
                    _ => {}
                }
                self.add_node(Node::Element(el));
            }
        }
    }

    fn add_text(&mut self, text: &str) {
        if text.is_empty() || self.push_alt(text) {
            return;
        }
        if let Some(Frame::CodeBlock { text: buf, .. }) = self.stack.last_mut() {
            buf.push_str(text);
            return;
        }
        if self.link_depth > 0 {
            self.add_node(Node::Text(text.to_string()));
            return;
        }

        let mut last = 0;
        for m in BARE_URL.find_iter(text) {
            if m.start() > last {
                self.add_node(Node::Text(text[last..m.start()].to_string()));
            }
            let mut link = Element::new("a").with_attr("href", m.as_str());
            link.push(Node::Text(m.as_str().to_string()));
            self.add_node(Node::Element(link));
            last = m.end();
        }
        if last < text.len() {
            self.add_node(Node::Text(text[last..].to_string()));
        }
    }

    /// Route text into the innermost open image's alt text
    fn push_alt(&mut self, text: &str) -> bool {
        for frame in self.stack.iter_mut().rev() {
            if let Frame::Image { alt, .. } = frame {
                alt.push_str(text);
                return true;
            }
        }
        false
    }

    fn in_image(&self) -> bool {
        self.stack.iter().any(|f| matches!(f, Frame::Image { .. }))
    }

    /// Add a node to the innermost open element, or the root
    fn add_node(&mut self, node: Node) {
        for frame in self.stack.iter_mut().rev() {
            if let Frame::Element(el) = frame {
                el.push(node);
                return;
            }
        }
        self.root.push(node);
    }
}

fn heading_tag(level: HeadingLevel) -> &'static str {
    match level {
        HeadingLevel::H1 => "h1",
        HeadingLevel::H2 => "h2",
        HeadingLevel::H3 => "h3",
        HeadingLevel::H4 => "h4",
        HeadingLevel::H5 => "h5",
        HeadingLevel::H6 => "h6",
    }
}

/// Parse markdown and lower it into an HTML tree
pub fn lower(markdown: &str) -> Vec<Node> {
    Lowering::new().run(markdown)
}

#[cfg(test)]
mod tests {
    use super::super::tree::to_html;
    use super::*;

    fn render(md: &str) -> String {
        to_html(&lower(md))
    }

    #[test]
    fn test_basic_blocks() {
        let html = render("# Title\n\nSome *emphasis* and **strong**.");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<p>Some <em>emphasis</em> and <strong>strong</strong>.</p>"));
    }

    #[test]
    fn test_fenced_code_keeps_language_and_text() {
        let html = render("```java\nint a = 1 < 2;\n```\n");
        assert_eq!(
            html,
            "<pre><code class=\"language-java\">int a = 1 &lt; 2;\n</code></pre>"
        );
    }

    #[test]
    fn test_indented_code_has_no_language() {
        let html = render("    plain\n");
        assert_eq!(html, "<pre><code>plain\n</code></pre>");
    }

    #[test]
    fn test_gfm_table() {
        let html = render("| a | b |\n|:--|--:|\n| 1 | 2 |\n");
        assert!(html.contains("<thead><tr><th style=\"text-align: left\">a</th>"));
        assert!(html.contains("<tbody><tr><td style=\"text-align: left\">1</td>"));
        assert!(html.contains("<td style=\"text-align: right\">2</td>"));
    }

    #[test]
    fn test_strikethrough_and_tasks() {
        let html = render("- [x] done ~~old~~\n- [ ] todo\n");
        assert!(html.contains("<del>old</del>"));
        assert!(html.contains(r#"<input type="checkbox" disabled="" checked="">"#));
        assert!(html.contains(r#"<input type="checkbox" disabled="">"#));
    }

    #[test]
    fn test_bare_url_autolinked() {
        let html = render("See https://example.com/docs, then continue.");
        assert!(html.contains(
            r#"<a href="https://example.com/docs">https://example.com/docs</a>, then"#
        ));
    }

    #[test]
    fn test_link_text_not_autolinked_twice() {
        let html = render("[https://a.dev](https://a.dev)");
        assert_eq!(html.matches("<a ").count(), 1);
    }

    #[test]
    fn test_image_alt_collects_text() {
        let html = render("![a *fancy* cat](cat.png \"Cat\")");
        assert!(html.contains(r#"<img src="cat.png" alt="a fancy cat" title="Cat">"#));
    }

    #[test]
    fn test_raw_html_kept_verbatim() {
        let nodes = lower("<div class=\"note\">hi</div>\n");
        assert!(matches!(&nodes[0], Node::Raw(r) if r.contains("<div class=\"note\">")));
    }
}
