//! State behind the auxiliary widgets: modal dialogs, the file picker, the
//! message queue and the log buffer.
//!
//! None of this depends on the widget toolkit; the client draws it.

pub mod file;
pub mod log_buffer;
pub mod messages;

use std::collections::{HashMap, HashSet};

pub use file::{FileDialogState, FileEntry};
pub use log_buffer::{LogBuffer, LogLevel, LogLine};
pub use messages::MessageQueue;

/// Identifies a modal dialog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DialogId {
    OpenMesh,
    OpenVertexShader,
    OpenFragmentShader,
    Message,
}

impl DialogId {
    /// Title shown on the modal window.
    pub fn title(self) -> &'static str {
        match self {
            Self::OpenMesh => "Open mesh",
            Self::OpenVertexShader => "Open vertex shader",
            Self::OpenFragmentShader => "Open fragment shader",
            Self::Message => "Message",
        }
    }
}

/// Tracks which modals are open and owns the per-dialog file picker state.
///
/// A file picker's state lives from the moment its dialog opens until it is
/// closed, so reopening starts fresh.
#[derive(Debug, Default)]
pub struct DialogManager {
    open: HashSet<DialogId>,
    files: HashMap<DialogId, FileDialogState>,
}

impl DialogManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, id: DialogId) {
        log::debug!("opening dialog {:?}", id);
        self.open.insert(id);
    }

    /// Opens a file picker dialog with its initial state.
    pub fn open_file(&mut self, id: DialogId, state: FileDialogState) {
        self.files.insert(id, state);
        self.open(id);
    }

    pub fn close(&mut self, id: DialogId) {
        if self.open.remove(&id) {
            log::debug!("closing dialog {:?}", id);
        }
        self.files.remove(&id);
    }

    pub fn is_open(&self, id: DialogId) -> bool {
        self.open.contains(&id)
    }

    pub fn any_open(&self) -> bool {
        !self.open.is_empty()
    }

    /// File picker state of an open dialog.
    pub fn file_mut(&mut self, id: DialogId) -> Option<&mut FileDialogState> {
        if self.is_open(id) {
            self.files.get_mut(&id)
        } else {
            None
        }
    }
}
