pub mod log;
pub mod memory;
pub mod noop;
pub mod traits;

pub use self::log::LogSink;
pub use memory::MemorySink;
pub use noop::NoopSink;
pub use traits::{DiagnosticEvent, DiagnosticSink, Stage};

use crate::config::DiagnosticsConfig;

/// Factory: create the right sink from config
pub fn create_sink(config: &DiagnosticsConfig) -> Box<dyn DiagnosticSink> {
    match config.backend.as_str() {
        "log" => Box::new(LogSink::new()),
        "memory" => Box::new(MemorySink::new()),
        "none" | "noop" => Box::new(NoopSink),
        _ => {
            tracing::warn!(
                "Unknown diagnostics backend '{}', falling back to noop",
                config.backend
            );
            Box::new(NoopSink)
        }
    }
}
