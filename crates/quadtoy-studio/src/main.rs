//! quadtoy studio: runs one of the bundled shaders in a window.
//!
//! Usage: `quadtoy-studio [gradient|mandelbulb]`. Press Tab to save a PNG
//! snapshot into the working directory.

mod payloads;

use std::process::ExitCode;

use quadtoy_engine::logging::{init_logging, LoggingConfig};

fn main() -> ExitCode {
    init_logging(LoggingConfig::default());

    let name = std::env::args().nth(1).unwrap_or_else(|| payloads::DEFAULT.to_string());
    let Some(payload) = payloads::find(&name) else {
        eprintln!("unknown shader `{name}`; available: {}", payloads::names().join(", "));
        return ExitCode::from(2);
    };

    log::info!("running `{}`", payload.name);
    match (payload.build)().run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("quadtoy runtime error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
