//! Logging utilities.
//!
//! The harness reports shader diagnostics through the `log` facade; this
//! module only decides how those records reach the terminal.

mod init;

pub use init::{init_logging, LoggingConfig, DEFAULT_FILTER};
