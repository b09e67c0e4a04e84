//! Frame snapshots.
//!
//! A snapshot re-renders the frame recorded in a [`ShaderContext`] into an
//! offscreen texture, reads it back and writes it as `<unix millis>.png`.
//!
//! [`ShaderContext`]: crate::shader::ShaderContext

mod capture;
mod file;
mod request;

pub use capture::{capture, CAPTURE_FORMAT};
pub use file::{file_name, save, unix_millis};
pub use request::{PendingSnapshot, SnapshotConfig};
