//! The promise registry.
//!
//! Native tasks refer to outstanding script-side resolvers by a 32-bit id.
//! An entry is created on the async call and consumed exactly once, on
//! resolution or rejection; consuming it a second time is a no-op.

use script_engine::ResolverId;
use std::collections::HashMap;
use tracing::warn;

/// Id of an outstanding promise entry.
pub type PromiseId = u32;

/// Indexed table of outstanding script-side resolvers.
#[derive(Default)]
pub struct PromiseRegistry {
    entries: HashMap<PromiseId, ResolverId>,
    next: PromiseId,
}

impl PromiseRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resolver and returns its entry id.
    pub fn add(&mut self, resolver: ResolverId) -> PromiseId {
        let id = self.next;
        self.next = self.next.wrapping_add(1);
        self.entries.insert(id, resolver);
        id
    }

    /// Consumes an entry. Returns `None` (and warns) if the id was already
    /// consumed, so no promise is ever settled twice.
    pub fn take(&mut self, id: PromiseId) -> Option<ResolverId> {
        let entry = self.entries.remove(&id);
        if entry.is_none() {
            warn!(id, "promise entry consumed twice");
        }
        entry
    }

    /// Number of unsettled entries.
    pub fn outstanding(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_consumed_exactly_once() {
        let mut registry = PromiseRegistry::new();
        let id = registry.add(3);
        assert_eq!(registry.take(id), Some(3));
        assert_eq!(registry.take(id), None);
        assert_eq!(registry.outstanding(), 0);
    }

    #[test]
    fn ids_are_distinct_across_entries() {
        let mut registry = PromiseRegistry::new();
        let a = registry.add(0);
        let b = registry.add(1);
        assert_ne!(a, b);
        assert_eq!(registry.outstanding(), 2);
    }
}
