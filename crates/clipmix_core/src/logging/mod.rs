//! Two channels: process diagnostics through `tracing`, and one
//! [`JobLogger`] file per mix job that the control surface can also follow.
//!
//! # Example
//!
//! ```no_run
//! use clipmix_core::logging::{JobLogger, LogConfig};
//!
//! let logger = JobLogger::new("mix", "/path/to/logs", LogConfig::default(), None).unwrap();
//!
//! logger.phase("Output 1/3");
//! logger.command("ffmpeg -y -i clip.mp4 ...");
//! logger.success("Output written");
//! ```

mod job_logger;
mod types;

pub use job_logger::JobLogger;
pub use types::{LogCallback, LogConfig, LogLevel, Marker};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the process-wide subscriber. `RUST_LOG` overrides `default_level`.
pub fn init_tracing(default_level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_filter_str()));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();
}

/// Initialize tracing for tests (only logs warnings and above).
#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}
