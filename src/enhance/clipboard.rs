//! Clipboard access for the copy button

use thiserror::Error;

use super::dom::Document;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClipboardError {
    #[error("Clipboard not available")]
    Unavailable,

    #[error("Clipboard rejected the write: {0}")]
    Rejected(String),
}

/// The host's primary clipboard
pub trait Clipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// The host's legacy copy command, copying whatever text is selected
pub trait CopyCommand {
    fn exec_copy(&mut self, selection: &str) -> Result<(), ClipboardError>;
}

/// Copy command for hosts that have none
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCopyCommand;

impl CopyCommand for NoCopyCommand {
    fn exec_copy(&mut self, _selection: &str) -> Result<(), ClipboardError> {
        Err(ClipboardError::Unavailable)
    }
}

/// Copy through an off-screen text field and the legacy copy command
///
/// The field is appended to the document root, selected, copied and removed
/// again whether or not the command succeeds.
pub fn fallback_copy(
    doc: &mut Document,
    command: &mut dyn CopyCommand,
    text: &str,
) -> Result<(), ClipboardError> {
    let root = doc.root();
    let field = doc.create_element("textarea");
    doc.set_attr(field, "style", "position: fixed; top: -9999px");
    doc.set_attr(field, "readonly", "");
    let value = doc.create_text(text);
    doc.append_child(field, value);
    doc.append_child(root, field);

    let selection = doc.text_content(field);
    let result = command.exec_copy(&selection);

    doc.detach(field);
    result
}
