//! Code block enhancement
//!
//! Turns every `pre > code` inside an article container into a widget with a
//! language label, a copy button and a line-number gutter. Runs against the
//! in-memory [`Document`]; a browser host drives it through the same calls.

mod clipboard;
pub mod dom;
mod engine;
mod event_loop;
pub mod widget;

pub use clipboard::{fallback_copy, Clipboard, ClipboardError, CopyCommand, NoCopyCommand};
pub use dom::{Document, MutationRecord, NodeId};
pub use engine::{Enhancer, Subscription, COPIED_MS};
pub use event_loop::{EventLoop, TimerId};
