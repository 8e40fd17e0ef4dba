//! In-memory document
//!
//! An arena of element and text nodes with the handful of operations the
//! enhancer needs, plus subtree mutation observers. Attribute values and text
//! are stored decoded; serialization escapes them again.

use std::collections::HashMap;

use crate::content::markdown::tree::{escape_attr, escape_text, is_void};

/// Handle to a node in a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Handle to a registered mutation observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

#[derive(Debug, Clone)]
enum NodeData {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct NodeEntry {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// One child-list change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    /// Node whose children changed
    pub target: NodeId,
    pub added: Vec<NodeId>,
    pub removed: Vec<NodeId>,
}

#[derive(Debug)]
struct Observer {
    target: NodeId,
    records: Vec<MutationRecord>,
}

/// Arena-backed document tree
///
/// Nodes are never freed: a detached node keeps its slot (and can be
/// reinserted) until the document is dropped. Hosts that live long and churn
/// many nodes should recreate the document per page.
#[derive(Debug)]
pub struct Document {
    nodes: Vec<NodeEntry>,
    root: NodeId,
    observers: HashMap<ObserverId, Observer>,
    next_observer: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Empty document with a `body` root
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            observers: HashMap::new(),
            next_observer: 0,
        };
        doc.root = doc.create_element("body");
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn entry(&self, id: NodeId) -> &NodeEntry {
        &self.nodes[id.0]
    }

    fn entry_mut(&mut self, id: NodeId) -> &mut NodeEntry {
        &mut self.nodes[id.0]
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
        })
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeEntry {
            data,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Tag name, `None` for text nodes
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.entry(id).data {
            NodeData::Element { tag, .. } => Some(tag),
            NodeData::Text(_) => None,
        }
    }

    pub fn is_element(&self, id: NodeId, tag: &str) -> bool {
        self.tag(id) == Some(tag)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.entry(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.entry(id).children
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.entry(id).data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
            NodeData::Text(_) => None,
        }
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let NodeData::Element { attrs, .. } = &mut self.entry_mut(id).data {
            match attrs.iter_mut().find(|(k, _)| k == name) {
                Some((_, v)) => *v = value.to_string(),
                None => attrs.push((name.to_string(), value.to_string())),
            }
        }
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attr(id, "class")
            .is_some_and(|c| c.split_whitespace().any(|c| c == class))
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if self.has_class(id, class) {
            return;
        }
        let value = match self.attr(id, "class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing, class),
            _ => class.to_string(),
        };
        self.set_attr(id, "class", &value);
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if let Some(existing) = self.attr(id, "class") {
            let value = existing
                .split_whitespace()
                .filter(|c| *c != class)
                .collect::<Vec<_>>()
                .join(" ");
            self.set_attr(id, "class", &value);
        }
    }

    /// Whether `node` is `ancestor` or lies beneath it
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// `id` and everything beneath it, in document order
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev());
        }
        out
    }

    /// Elements with `tag` at or beneath `id`, in document order
    pub fn find_all(&self, id: NodeId, tag: &str) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|n| self.is_element(*n, tag))
            .collect()
    }

    /// First element with `tag` strictly beneath `id`
    pub fn find_first(&self, id: NodeId, tag: &str) -> Option<NodeId> {
        self.descendants(id)
            .into_iter()
            .skip(1)
            .find(|n| self.is_element(*n, tag))
    }

    /// Concatenated text beneath `id`
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for node in self.descendants(id) {
            if let NodeData::Text(text) = &self.entry(node).data {
                out.push_str(text);
            }
        }
        out
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.entry_mut(parent).children.push(child);
        self.entry_mut(child).parent = Some(parent);
        self.record(parent, vec![child], Vec::new());
    }

    /// Insert `child` before `reference`, which must be a child of `parent`
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) {
        self.detach(child);
        let index = self
            .children(parent)
            .iter()
            .position(|c| *c == reference)
            .unwrap_or(self.children(parent).len());
        self.entry_mut(parent).children.insert(index, child);
        self.entry_mut(child).parent = Some(parent);
        self.record(parent, vec![child], Vec::new());
    }

    /// Take `id` out of its parent; the node stays alive and can be reinserted
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.entry(id).parent {
            self.entry_mut(parent).children.retain(|c| *c != id);
            self.entry_mut(id).parent = None;
            self.record(parent, Vec::new(), vec![id]);
        }
    }

    /// Remove every child of `id`
    pub fn clear_children(&mut self, id: NodeId) {
        let removed = std::mem::take(&mut self.entry_mut(id).children);
        if removed.is_empty() {
            return;
        }
        for child in &removed {
            self.entry_mut(*child).parent = None;
        }
        self.record(id, Vec::new(), removed);
    }

    /// Parse `html` and append the resulting nodes to `parent`
    pub fn append_html(&mut self, parent: NodeId, html: &str) -> Vec<NodeId> {
        let Ok(dom) = tl::parse(html, tl::ParserOptions::default()) else {
            tracing::warn!("Failed to parse HTML fragment, inserting it as text");
            let text = self.create_text(html);
            self.append_child(parent, text);
            return vec![text];
        };
        let parser = dom.parser();
        let built: Vec<NodeId> = dom
            .children()
            .iter()
            .filter_map(|handle| self.build(*handle, parser))
            .collect();
        for node in &built {
            self.append_child(parent, *node);
        }
        built
    }

    /// Replace the children of `id` with parsed `html`
    pub fn set_inner_html(&mut self, id: NodeId, html: &str) {
        self.clear_children(id);
        self.append_html(id, html);
    }

    fn build(&mut self, handle: tl::NodeHandle, parser: &tl::Parser) -> Option<NodeId> {
        match handle.get(parser)? {
            tl::Node::Tag(tag) => {
                let el = self.create_element(&tag.name().as_utf8_str());
                for (key, value) in tag.attributes().iter() {
                    let value = value
                        .map(|v| html_escape::decode_html_entities(&v).into_owned())
                        .unwrap_or_default();
                    self.set_attr(el, &key, &value);
                }
                let children: Vec<tl::NodeHandle> = tag.children().top().iter().copied().collect();
                for child in children {
                    if let Some(node) = self.build(child, parser) {
                        self.entry_mut(node).parent = Some(el);
                        self.entry_mut(el).children.push(node);
                    }
                }
                Some(el)
            }
            tl::Node::Raw(bytes) => {
                let text = html_escape::decode_html_entities(&bytes.as_utf8_str()).into_owned();
                Some(self.create_text(&text))
            }
            tl::Node::Comment(_) => None,
        }
    }

    /// Markup of `id` and its subtree
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_html(id, &mut out);
        out
    }

    /// Markup of the children of `id`
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(id) {
            self.write_html(*child, &mut out);
        }
        out
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        let entry = self.entry(id);
        match &entry.data {
            NodeData::Text(text) => out.push_str(&escape_text(text)),
            NodeData::Element { tag, attrs } => {
                out.push('<');
                out.push_str(tag);
                for (k, v) in attrs {
                    out.push_str(&format!(" {}=\"{}\"", k, escape_attr(v)));
                }
                out.push('>');
                if is_void(tag) {
                    return;
                }
                for child in &entry.children {
                    self.write_html(*child, out);
                }
                out.push_str(&format!("</{}>", tag));
            }
        }
    }

    /// Start recording child-list changes at or beneath `target`
    pub fn observe(&mut self, target: NodeId) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.insert(
            id,
            Observer {
                target,
                records: Vec::new(),
            },
        );
        id
    }

    pub fn disconnect(&mut self, id: ObserverId) {
        self.observers.remove(&id);
    }

    /// Drain the records queued for an observer
    pub fn take_records(&mut self, id: ObserverId) -> Vec<MutationRecord> {
        self.observers
            .get_mut(&id)
            .map(|o| std::mem::take(&mut o.records))
            .unwrap_or_default()
    }

    fn record(&mut self, target: NodeId, added: Vec<NodeId>, removed: Vec<NodeId>) {
        if self.observers.is_empty() {
            return;
        }
        let watching: Vec<ObserverId> = self
            .observers
            .iter()
            .filter(|(_, o)| self.contains(o.target, target))
            .map(|(id, _)| *id)
            .collect();
        for id in watching {
            if let Some(observer) = self.observers.get_mut(&id) {
                observer.records.push(MutationRecord {
                    target,
                    added: added.clone(),
                    removed: removed.clone(),
                });
            }
        }
    }
}
