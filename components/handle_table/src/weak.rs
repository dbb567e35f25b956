//! The weak-handle slot table.
//!
//! Weak handles exist to survive the gap between an explicit native-side
//! deinit and the script engine's finalizer callback. They have no
//! enumeration need, so they live in a flat slot allocator rather than the
//! resource lists. After explicit deinit the tag becomes `Null`; a native
//! lookup against such a slot must surface `HandleExpired`.

use core_types::{HandleTag, RuntimeError, WeakId};
use std::any::Any;

struct WeakSlot {
    tag: HandleTag,
    payload: Option<Box<dyn Any>>,
}

/// Flat slot allocator for weakly-held native objects.
#[derive(Default)]
pub struct WeakHandles {
    slots: Vec<Option<WeakSlot>>,
    free: Vec<WeakId>,
}

impl WeakHandles {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a slot for a native object.
    pub fn create(&mut self, tag: HandleTag, payload: Box<dyn Any>) -> WeakId {
        let slot = WeakSlot {
            tag,
            payload: Some(payload),
        };
        match self.free.pop() {
            Some(id) => {
                self.slots[id as usize] = Some(slot);
                id
            }
            None => {
                self.slots.push(Some(slot));
                (self.slots.len() - 1) as WeakId
            }
        }
    }

    /// Tag of a slot, if present.
    pub fn tag(&self, id: WeakId) -> Option<HandleTag> {
        self.slots.get(id as usize)?.as_ref().map(|s| s.tag)
    }

    /// Validates the tag and borrows the native object.
    ///
    /// Returns `HandleExpired` when the slot is gone or was explicitly
    /// deinited, and `CantConvert` on a tag mismatch.
    pub fn lookup(&self, id: WeakId, expected: HandleTag) -> Result<&dyn Any, RuntimeError> {
        let slot = self
            .slots
            .get(id as usize)
            .and_then(|s| s.as_ref())
            .ok_or(RuntimeError::HandleExpired)?;
        if slot.tag == HandleTag::Null {
            return Err(RuntimeError::HandleExpired);
        }
        if slot.tag != expected {
            return Err(RuntimeError::CantConvert(format!(
                "expected {:?} handle, found {:?}",
                expected, slot.tag
            )));
        }
        slot.payload
            .as_deref()
            .ok_or(RuntimeError::HandleExpired)
    }

    /// Explicit native-side deinit: drops the payload, nulls the tag,
    /// keeps the slot for the finalizer.
    pub fn deinit(&mut self, id: WeakId) {
        if let Some(Some(slot)) = self.slots.get_mut(id as usize) {
            slot.payload = None;
            slot.tag = HandleTag::Null;
        }
    }

    /// Finalizer path: deinits by tag if still live, then frees the slot.
    pub fn destroy(&mut self, id: WeakId) {
        if let Some(entry) = self.slots.get_mut(id as usize) {
            if entry.take().is_some() {
                self.free.push(id);
            }
        }
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
