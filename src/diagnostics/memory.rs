use super::traits::{DiagnosticEvent, DiagnosticSink};
use std::sync::{Mutex, PoisonError};

/// Keeps every event of a run for later inspection.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|event| event.name() == name)
            .count()
    }
}

impl DiagnosticSink for MemorySink {
    fn record(&self, event: &DiagnosticEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }

    fn name(&self) -> &str {
        "memory"
    }
}
