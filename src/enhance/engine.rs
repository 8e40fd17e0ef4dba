//! Scanning, rescanning on insertion, and the copy button state machine

use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use super::clipboard::{self, Clipboard, ClipboardError, CopyCommand, NoCopyCommand};
use super::dom::{Document, NodeId, ObserverId};
use super::event_loop::{EventLoop, TimerId};
use super::widget::{self, CHECK_ICON, COPIED_TITLE, COPY_ICON, COPY_TITLE};

/// How long the copied state stays visible
pub const COPIED_MS: u64 = 1500;

/// Flag set on a `pre` once it has been wrapped
const ENHANCED_ATTR: &str = "data-enhanced";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Task {
    Copy(NodeId),
    Revert(NodeId),
}

#[derive(Debug)]
struct CopyButton {
    pre: NodeId,
    revert: Option<TimerId>,
}

struct Watch {
    observer: ObserverId,
    container: NodeId,
    active: Rc<Cell<bool>>,
    on_change: Box<dyn FnMut(usize)>,
}

/// Handle for an active [`Enhancer::observe`] registration
#[must_use = "dropping a subscription keeps it active; call unsubscribe to stop"]
#[derive(Debug)]
pub struct Subscription {
    active: Rc<Cell<bool>>,
}

impl Subscription {
    /// Stop rescanning; takes effect before the next delivery
    pub fn unsubscribe(self) {
        self.active.set(false);
    }
}

/// Owns a document and enhances the code blocks in it
pub struct Enhancer {
    doc: Document,
    tasks: EventLoop<Task>,
    clipboard: Option<Box<dyn Clipboard>>,
    copy_command: Box<dyn CopyCommand>,
    buttons: HashMap<NodeId, CopyButton>,
    watches: Vec<Watch>,
}

impl Enhancer {
    /// Enhancer over `doc` with no clipboard available
    pub fn new(doc: Document) -> Self {
        Self {
            doc,
            tasks: EventLoop::new(),
            clipboard: None,
            copy_command: Box::new(NoCopyCommand),
            buttons: HashMap::new(),
            watches: Vec::new(),
        }
    }

    pub fn with_clipboard(mut self, clipboard: Box<dyn Clipboard>) -> Self {
        self.clipboard = Some(clipboard);
        self
    }

    pub fn with_copy_command(mut self, command: Box<dyn CopyCommand>) -> Self {
        self.copy_command = command;
        self
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    /// Milliseconds on the virtual clock
    pub fn now(&self) -> u64 {
        self.tasks.now()
    }

    /// Enhance every unprocessed block at or beneath `root`
    ///
    /// Returns the number of blocks wrapped. Enhanced blocks are skipped, so
    /// repeated scans are harmless.
    pub fn scan(&mut self, root: NodeId) -> usize {
        let mut count = 0;
        for pre in self.doc.find_all(root, "pre") {
            if self.enhance(pre) {
                count += 1;
            }
        }
        if count > 0 {
            tracing::debug!("Enhanced {} code blocks", count);
        }
        count
    }

    fn enhance(&mut self, pre: NodeId) -> bool {
        if self.doc.attr(pre, ENHANCED_ATTR) == Some("true") || self.doc.parent(pre).is_none() {
            return false;
        }
        let Some(code) = self.doc.find_first(pre, "code") else {
            return false;
        };

        // Flag first so a re-entrant scan never wraps twice
        self.doc.set_attr(pre, ENHANCED_ATTR, "true");

        match widget::wrap(&mut self.doc, pre, code) {
            Some(w) => {
                self.buttons.insert(
                    w.button,
                    CopyButton {
                        pre,
                        revert: None,
                    },
                );
                true
            }
            None => false,
        }
    }

    /// Scan `container` now and again whenever nodes are inserted beneath it
    ///
    /// `on_change` receives the number of blocks enhanced by each rescan.
    pub fn observe<F>(&mut self, container: NodeId, on_change: F) -> Subscription
    where
        F: FnMut(usize) + 'static,
    {
        self.scan(container);
        let observer = self.doc.observe(container);
        let active = Rc::new(Cell::new(true));
        self.watches.push(Watch {
            observer,
            container,
            active: Rc::clone(&active),
            on_change: Box::new(on_change),
        });
        Subscription { active }
    }

    /// Hand pending mutation records to their watches until nothing changes
    ///
    /// Each inserted subtree is scanned, along with the `pre` enclosing the
    /// insertion point, if any: a `code` added to a bare `pre` completes a block.
    pub fn deliver(&mut self) {
        loop {
            self.prune_watches();

            let mut delivered = false;
            for i in 0..self.watches.len() {
                let observer = self.watches[i].observer;
                let container = self.watches[i].container;
                let records = self.doc.take_records(observer);
                if records.is_empty() {
                    continue;
                }
                delivered = true;

                let mut seen = HashSet::new();
                let mut count = 0;
                for node in records.iter().flat_map(|r| r.added.iter().copied()) {
                    if !seen.insert(node) || !self.doc.contains(container, node) {
                        continue;
                    }
                    if let Some(pre) = self.enclosing_pre(container, node) {
                        if self.enhance(pre) {
                            count += 1;
                        }
                    }
                    if self.doc.tag(node).is_some() {
                        count += self.scan(node);
                    }
                }
                (self.watches[i].on_change)(count);
            }

            if !delivered {
                break;
            }
        }
    }

    /// Nearest `pre` strictly above `node`, stopping at `container`
    fn enclosing_pre(&self, container: NodeId, node: NodeId) -> Option<NodeId> {
        let mut current = self.doc.parent(node);
        while let Some(id) = current {
            if self.doc.is_element(id, "pre") {
                return Some(id);
            }
            if id == container {
                return None;
            }
            current = self.doc.parent(id);
        }
        None
    }

    fn prune_watches(&mut self) {
        let doc = &mut self.doc;
        self.watches.retain(|w| {
            if w.active.get() {
                true
            } else {
                doc.disconnect(w.observer);
                false
            }
        });
    }

    /// Click a copy button; `false` if `button` is not one
    ///
    /// The copy itself runs as a queued task.
    pub fn click(&mut self, button: NodeId) -> bool {
        if !self.buttons.contains_key(&button) {
            return false;
        }
        self.tasks.queue(Task::Copy(button));
        true
    }

    /// Copy buttons created so far
    pub fn buttons(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.buttons.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Run queued tasks and observer deliveries until both are drained
    pub fn run_until_idle(&mut self) {
        loop {
            self.deliver();
            match self.tasks.next_task() {
                Some(task) => self.run(task),
                None => break,
            }
        }
    }

    /// Move the clock forward `ms`, firing timers as they come due
    pub fn advance(&mut self, ms: u64) {
        let until = self.tasks.now().saturating_add(ms);
        self.run_until_idle();
        while let Some(task) = self.tasks.next_due(until) {
            self.run(task);
            self.run_until_idle();
        }
        self.tasks.set_now(until);
    }

    fn run(&mut self, task: Task) {
        match task {
            Task::Copy(button) => self.copy(button),
            Task::Revert(button) => self.revert(button),
        }
    }

    fn copy(&mut self, button: NodeId) {
        let Some(pre) = self.buttons.get(&button).map(|b| b.pre) else {
            return;
        };
        let text = match self.doc.find_first(pre, "code") {
            Some(code) => self.doc.text_content(code).trim().to_string(),
            None => return,
        };
        if text.is_empty() {
            return;
        }

        match self.write_clipboard(&text) {
            Ok(()) => self.show_copied(button),
            Err(e) => tracing::debug!("Copy failed: {}", e),
        }
    }

    /// Primary clipboard first, then the off-screen text field
    fn write_clipboard(&mut self, text: &str) -> Result<(), ClipboardError> {
        let primary = match self.clipboard.as_mut() {
            Some(clipboard) => clipboard.write_text(text),
            None => Err(ClipboardError::Unavailable),
        };
        match primary {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::debug!("Primary clipboard failed ({}), using fallback", e);
                clipboard::fallback_copy(&mut self.doc, self.copy_command.as_mut(), text)
            }
        }
    }

    fn show_copied(&mut self, button: NodeId) {
        self.doc.add_class(button, "copied");
        self.doc.set_inner_html(button, CHECK_ICON);
        self.doc.set_attr(button, "title", COPIED_TITLE);

        if let Some(state) = self.buttons.get_mut(&button) {
            if let Some(pending) = state.revert.take() {
                self.tasks.clear_timeout(pending);
            }
            state.revert = Some(self.tasks.set_timeout(COPIED_MS, Task::Revert(button)));
        }
    }

    fn revert(&mut self, button: NodeId) {
        if let Some(state) = self.buttons.get_mut(&button) {
            state.revert = None;
        }
        self.doc.remove_class(button, "copied");
        self.doc.set_inner_html(button, COPY_ICON);
        self.doc.set_attr(button, "title", COPY_TITLE);
    }
}
