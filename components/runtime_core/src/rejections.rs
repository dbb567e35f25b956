//! Unhandled promise-rejection tracking.
//!
//! Rejections are recorded keyed by promise identity and retracted if a
//! handler is attached later; whatever remains is reported once, at
//! shutdown.

use core_types::ObjectId;
use script_engine::RejectionEvent;
use std::collections::HashMap;

/// Ledger of promises rejected without a handler.
#[derive(Default)]
pub struct RejectionLedger {
    pending: HashMap<ObjectId, String>,
}

impl RejectionLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a batch of engine bookkeeping events.
    pub fn observe(&mut self, events: Vec<RejectionEvent>) {
        for event in events {
            match event {
                RejectionEvent::Unhandled { promise, value } => {
                    self.pending.entry(promise).or_insert_with(|| value.to_string());
                }
                RejectionEvent::HandlerAdded { promise } => {
                    self.pending.remove(&promise);
                }
            }
        }
    }

    /// Whether any rejection is still unretracted.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of unretracted rejections.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Takes the report lines, one per still-unhandled rejection.
    pub fn drain_reports(&mut self) -> Vec<String> {
        let mut reports: Vec<String> = self
            .pending
            .drain()
            .map(|(_, value)| format!("Uncaught (in promise) {}", value))
            .collect();
        reports.sort();
        reports
    }
}
