use super::traits::{DiagnosticEvent, DiagnosticSink};

/// Zero-overhead sink.
pub struct NoopSink;

impl DiagnosticSink for NoopSink {
    #[inline(always)]
    fn record(&self, _event: &DiagnosticEvent) {}

    fn name(&self) -> &str {
        "noop"
    }
}
