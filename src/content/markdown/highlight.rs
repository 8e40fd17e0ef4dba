//! Syntax highlighting stage
//!
//! Highlighting trusts the fence tag only. syntect scopes are folded into a
//! flat run of `<span class="hljs-*">` tokens so later stages can slice the
//! code text by offset.

use syntect::parsing::{ParseState, ScopeStack, SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

use super::tree::{Element, Node};
use super::PipelineError;
use crate::config::HighlightConfig;

/// Scope prefixes and the token class they map to, most specific first
const SCOPE_CLASSES: &[(&str, &str)] = &[
    ("comment", "comment"),
    ("string", "string"),
    ("constant.numeric", "number"),
    ("constant.language", "literal"),
    ("constant.character", "string"),
    ("storage.type.annotation", "meta"),
    ("punctuation.definition.annotation", "meta"),
    ("variable.annotation", "meta"),
    ("keyword", "keyword"),
    ("storage.modifier", "keyword"),
    ("storage.type", "type"),
    ("support.type", "type"),
    ("support.class", "type"),
    ("support.function", "built_in"),
    ("entity.name.tag", "name"),
    ("entity.other.attribute-name", "attr"),
    ("entity.other.inherited-class", "title"),
    ("entity.name", "title"),
    ("variable.parameter", "params"),
    ("variable.language", "variable"),
];

/// Fence-tag driven highlighter backed by syntect grammars
pub struct Highlighter {
    syntax_set: SyntaxSet,
    config: HighlightConfig,
}

impl Highlighter {
    pub fn new(config: HighlightConfig) -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            config,
        }
    }

    pub fn class_prefix(&self) -> &str {
        &self.config.class_prefix
    }

    /// Grammar for an allow-listed fence tag, if syntect ships one
    fn find_syntax(&self, lang: &str) -> Option<&SyntaxReference> {
        if !self.config.allows(lang) {
            return None;
        }
        let lang = lang.to_ascii_lowercase();
        self.syntax_set
            .find_syntax_by_token(&lang)
            .or_else(|| self.syntax_set.find_syntax_by_extension(&lang))
    }

    /// Highlight code into flat token nodes
    ///
    /// `Ok(None)` means the language is not highlighted and the block should
    /// stay as it is.
    pub fn highlight(&self, code: &str, lang: &str) -> Result<Option<Vec<Node>>, PipelineError> {
        let Some(syntax) = self.find_syntax(lang) else {
            tracing::debug!("No highlighting for fence tag `{}`", lang);
            return Ok(None);
        };

        let fail = |message: String| PipelineError::Highlight {
            lang: lang.to_string(),
            message,
        };

        let mut state = ParseState::new(syntax);
        let mut stack = ScopeStack::new();
        let mut tokens: Vec<(Option<&'static str>, String)> = Vec::new();

        for line in LinesWithEndings::from(code) {
            let ops = state
                .parse_line(line, &self.syntax_set)
                .map_err(|e| fail(e.to_string()))?;
            let mut pos = 0;
            for (idx, op) in ops {
                if idx > pos {
                    push_token(&mut tokens, token_class(&stack), &line[pos..idx]);
                    pos = idx;
                }
                stack.apply(&op).map_err(|e| fail(format!("{:?}", e)))?;
            }
            if pos < line.len() {
                push_token(&mut tokens, token_class(&stack), &line[pos..]);
            }
        }

        let prefix = &self.config.class_prefix;
        let nodes = tokens
            .into_iter()
            .map(|(class, text)| match class {
                Some(class) => {
                    let mut span =
                        Element::new("span").with_attr("class", &format!("{}{}", prefix, class));
                    span.push(Node::Text(text));
                    Node::Element(span)
                }
                None => Node::Text(text),
            })
            .collect();
        Ok(Some(nodes))
    }
}

/// Class of the innermost scope that has one
fn token_class(stack: &ScopeStack) -> Option<&'static str> {
    stack.as_slice().iter().rev().find_map(|scope| {
        let name = scope.build_string();
        SCOPE_CLASSES
            .iter()
            .find(|(prefix, _)| {
                name == *prefix || name.starts_with(&format!("{}.", prefix))
            })
            .map(|(_, class)| *class)
    })
}

/// Append a token, merging with the previous one when the class matches
fn push_token(tokens: &mut Vec<(Option<&'static str>, String)>, class: Option<&'static str>, text: &str) {
    if text.is_empty() {
        return;
    }
    match tokens.last_mut() {
        Some((last, buf)) if *last == class => buf.push_str(text),
        _ => tokens.push((class, text.to_string())),
    }
}

/// Highlight every `pre > code.language-X` whose payload is still plain text
pub fn highlight_code_blocks(
    nodes: &mut [Node],
    highlighter: &Highlighter,
) -> Result<(), PipelineError> {
    super::tree::try_walk_elements_mut(nodes, &mut |el: &mut Element| -> Result<(), PipelineError> {
        if el.tag != "pre" {
            return Ok(());
        }
        for child in el.children.iter_mut() {
            let Node::Element(code) = child else {
                continue;
            };
            if code.tag != "code" || code.has_class("hljs") {
                continue;
            }
            let Some(lang) = code.language().map(str::to_string) else {
                continue;
            };
            if !code.children.iter().all(|c| matches!(c, Node::Text(_))) {
                continue;
            }
            let Some(text) = code.plain_text() else {
                continue;
            };
            if let Some(tokens) = highlighter.highlight(&text, &lang)? {
                code.children = tokens;
                code.add_class("hljs");
            }
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::super::tree::to_html;
    use super::*;

    fn code_block(lang: &str, text: &str) -> Vec<Node> {
        let mut code = Element::new("code").with_attr("class", &format!("language-{}", lang));
        code.push(Node::Text(text.to_string()));
        let mut pre = Element::new("pre");
        pre.push(Node::Element(code));
        vec![Node::Element(pre)]
    }

    #[test]
    fn test_allow_listed_language_is_tokenized() {
        let hl = Highlighter::new(HighlightConfig::default());
        let mut tree = code_block("java", "public class A { String s = \"hi\"; }\n");
        highlight_code_blocks(&mut tree, &hl).unwrap();
        let html = to_html(&tree);
        assert!(html.contains("class=\"hljs language-java\""));
        assert!(html.contains("<span class=\"hljs-"));
        assert!(html.contains("\"hi\""));
    }

    #[test]
    fn test_unknown_language_left_plain() {
        let hl = Highlighter::new(HighlightConfig::default());
        let mut tree = code_block("foobar", "x <- 1\n");
        highlight_code_blocks(&mut tree, &hl).unwrap();
        assert_eq!(
            to_html(&tree),
            "<pre><code class=\"language-foobar\">x &lt;- 1\n</code></pre>"
        );
    }

    #[test]
    fn test_language_outside_allow_list_left_plain() {
        let hl = Highlighter::new(HighlightConfig::default());
        assert!(hl.highlight("fn main() {}\n", "rust").unwrap().is_none());
    }

    #[test]
    fn test_tokens_preserve_text() {
        let hl = Highlighter::new(HighlightConfig::default());
        let source = "SELECT name FROM users WHERE id = 1;\n-- done\n";
        let tokens = hl.highlight(source, "sql").unwrap().unwrap();
        let mut code = Element::new("code");
        code.children = tokens;
        assert_eq!(code.plain_text().as_deref(), Some(source));
    }
}
