use std::fmt;

/// High-level response after a surface error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; rendering may resume next frame.
    Reconfigured,
    /// Transient error; skip the current frame.
    SkipFrame,
    /// Fatal error (commonly OOM); terminate gracefully.
    Fatal,
}

/// No backend in the fallback list produced a usable adapter and device.
///
/// Nothing can be rendered without one, so the run ends with this error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextUnavailable {
    /// One line per attempted backend set, in order.
    pub attempts: Vec<String>,
}

impl fmt::Display for ContextUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no graphics context available")?;
        if !self.attempts.is_empty() {
            write!(f, " (tried: {})", self.attempts.join("; "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ContextUnavailable {}
