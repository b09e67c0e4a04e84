use std::path::PathBuf;

use winit::keyboard::KeyCode;

/// Where snapshots go and which key takes them.
#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    pub key: KeyCode,
    pub directory: PathBuf,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            key: KeyCode::Tab,
            directory: PathBuf::from("."),
        }
    }
}

/// At most one outstanding snapshot request.
#[derive(Debug, Default)]
pub struct PendingSnapshot {
    pending: bool,
}

impl PendingSnapshot {
    /// Returns `false` when a request was already pending.
    pub fn request(&mut self) -> bool {
        !std::mem::replace(&mut self.pending, true)
    }

    /// Consumes the request, if any.
    pub fn take(&mut self) -> bool {
        std::mem::replace(&mut self.pending, false)
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }
}
