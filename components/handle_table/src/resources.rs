//! The resource table.
//!
//! Typed native handles live in slots linked into one of two intrusive
//! singly-linked lists: windows (so the frame loop can iterate them) and a
//! generic list. A `Dummy` sentinel heads each list so maintenance never
//! special-cases "empty list". Insertion is constant time through a
//! remembered `last` id; removal finds the predecessor by linear scan, which
//! is acceptable because resources are few.
//!
//! Release is two-phase: `start_deinit` tears the native object down but
//! leaves the slot (a script handle may still reference it); `destroy`, the
//! script-finalizer path, is the only place a slot is freed.

use core_types::{HandleTag, ResourceId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// A native window the table can tear down and the frame loop can drive.
pub trait WindowResource {
    /// The platform's own id for this window (used to route events).
    fn platform_id(&self) -> u32;
    /// Destroys the native window.
    fn destroy(&mut self);
    /// Frame delay this window asks for (from its FPS limit).
    fn frame_delay_ms(&self) -> u64;
    /// Ends the frame: applies the FPS limit and swaps buffers.
    fn end_frame(&mut self, min_delay_ms: u64);
}

/// An embedded server the table can shut down asynchronously.
pub trait ServerResource {
    /// Requests shutdown; `on_closed` runs when the server confirms closure.
    fn request_shutdown(&mut self, on_closed: Box<dyn FnOnce() + Send>);
}

/// Typed payload of a resource slot.
pub enum ResourcePayload {
    /// Sentinel list head
    Dummy,
    /// A native window
    Window(Box<dyn WindowResource>),
    /// An embedded HTTP server
    Server(Box<dyn ServerResource>),
}

impl ResourcePayload {
    fn tag(&self) -> HandleTag {
        match self {
            ResourcePayload::Dummy => HandleTag::Dummy,
            ResourcePayload::Window(_) => HandleTag::Window,
            ResourcePayload::Server(_) => HandleTag::HttpServer,
        }
    }
}

/// Stable back-pointer handed to the script engine as finalizer context.
///
/// The struct is heap-pinned for the life of the slot, so its address (and
/// the id inside it) outlives the script-side wrapper object.
#[derive(Debug, PartialEq, Eq)]
pub struct ExternalHandle {
    /// The slot this handle points back to
    pub resource_id: ResourceId,
}

struct Slot {
    payload: Option<ResourcePayload>,
    tag: HandleTag,
    external: Box<ExternalHandle>,
    deinited: bool,
    on_deinit: Option<Box<dyn FnOnce()>>,
    shutdown_confirmed: Option<Arc<AtomicBool>>,
    next: Option<ResourceId>,
}

struct ResourceList {
    head: ResourceId,
    last: ResourceId,
}

/// The table of typed native handles.
pub struct ResourceTable {
    slots: Vec<Option<Slot>>,
    free: Vec<ResourceId>,
    windows: ResourceList,
    generic: ResourceList,
    active_window: Option<ResourceId>,
    window_count: usize,
}

impl ResourceTable {
    /// Creates an empty table with the two sentinel heads in place.
    pub fn new() -> Self {
        let mut table = Self {
            slots: Vec::new(),
            free: Vec::new(),
            windows: ResourceList { head: 0, last: 0 },
            generic: ResourceList { head: 0, last: 0 },
            active_window: None,
            window_count: 0,
        };
        let win_head = table.alloc(ResourcePayload::Dummy);
        let gen_head = table.alloc(ResourcePayload::Dummy);
        table.windows = ResourceList {
            head: win_head,
            last: win_head,
        };
        table.generic = ResourceList {
            head: gen_head,
            last: gen_head,
        };
        table
    }

    fn alloc(&mut self, payload: ResourcePayload) -> ResourceId {
        let tag = payload.tag();
        let id = match self.free.pop() {
            Some(id) => id,
            None => {
                self.slots.push(None);
                (self.slots.len() - 1) as ResourceId
            }
        };
        self.slots[id as usize] = Some(Slot {
            tag,
            payload: Some(payload),
            external: Box::new(ExternalHandle { resource_id: id }),
            deinited: false,
            on_deinit: None,
            shutdown_confirmed: None,
            next: None,
        });
        id
    }

    fn slot(&self, id: ResourceId) -> Option<&Slot> {
        self.slots.get(id as usize)?.as_ref()
    }

    fn slot_mut(&mut self, id: ResourceId) -> Option<&mut Slot> {
        self.slots.get_mut(id as usize)?.as_mut()
    }

    fn list_for(&mut self, tag: HandleTag) -> &mut ResourceList {
        if tag == HandleTag::Window {
            &mut self.windows
        } else {
            &mut self.generic
        }
    }

    /// Appends a handle, populating the external back-pointer.
    pub fn create(&mut self, payload: ResourcePayload) -> ResourceId {
        let tag = payload.tag();
        debug_assert_ne!(tag, HandleTag::Dummy, "sentinels are created internally");
        let id = self.alloc(payload);

        let list = self.list_for(tag);
        let last = list.last;
        list.last = id;
        if let Some(prev) = self.slot_mut(last) {
            prev.next = Some(id);
        }

        if tag == HandleTag::Window {
            self.window_count += 1;
            if self.active_window.is_none() {
                self.active_window = Some(id);
            }
        }
        debug!(id, ?tag, "resource created");
        id
    }

    /// Registers a callback fired exactly once, from the `destroy` path.
    pub fn set_on_deinit(&mut self, id: ResourceId, callback: Box<dyn FnOnce()>) {
        if let Some(slot) = self.slot_mut(id) {
            slot.on_deinit = Some(callback);
        }
    }

    /// The stable finalizer back-pointer for a live slot.
    pub fn external(&self, id: ResourceId) -> Option<&ExternalHandle> {
        self.slot(id).map(|s| s.external.as_ref())
    }

    /// Tag of a live slot.
    pub fn tag(&self, id: ResourceId) -> Option<HandleTag> {
        self.slot(id).map(|s| s.tag)
    }

    /// Whether the slot exists (live or deinited-but-present).
    pub fn contains(&self, id: ResourceId) -> bool {
        self.slot(id).is_some()
    }

    /// Whether `start_deinit` has run for this slot.
    pub fn is_deinited(&self, id: ResourceId) -> bool {
        self.slot(id).map(|s| s.deinited).unwrap_or(false)
    }

    /// Mutable access to a live window payload.
    pub fn window_mut(&mut self, id: ResourceId) -> Option<&mut dyn WindowResource> {
        let slot = self.slot_mut(id)?;
        if slot.deinited {
            return None;
        }
        match slot.payload.as_mut()? {
            ResourcePayload::Window(w) => Some(w.as_mut()),
            _ => None,
        }
    }

    /// Ids of live (not deinited) windows, in list order.
    pub fn live_windows(&self) -> Vec<ResourceId> {
        let mut out = Vec::new();
        let mut cursor = self.slot(self.windows.head).and_then(|s| s.next);
        while let Some(id) = cursor {
            let Some(slot) = self.slot(id) else { break };
            if !slot.deinited {
                out.push(id);
            }
            cursor = slot.next;
        }
        out
    }

    /// The window currently receiving input and frame updates.
    pub fn active_window(&self) -> Option<ResourceId> {
        self.active_window
    }

    /// Number of live windows.
    pub fn window_count(&self) -> usize {
        self.window_count
    }

    /// Number of non-sentinel slots still present.
    pub fn live_slots(&self) -> usize {
        self.slots
            .iter()
            .flatten()
            .filter(|s| s.tag != HandleTag::Dummy)
            .count()
    }

    /// Runs the tag-specific teardown; the slot remains with `deinited` set.
    ///
    /// For windows this is synchronous: destroy the native window, re-elect
    /// the active window, decrement the window count. For servers the
    /// shutdown callback fires when the server confirms closure.
    pub fn start_deinit(&mut self, id: ResourceId) {
        let Some(slot) = self.slot_mut(id) else { return };
        if slot.deinited {
            return;
        }
        let tag = slot.tag;
        match slot.payload.as_mut() {
            Some(ResourcePayload::Window(window)) => {
                window.destroy();
            }
            Some(ResourcePayload::Server(server)) => {
                let confirmed = Arc::new(AtomicBool::new(false));
                slot.shutdown_confirmed = Some(confirmed.clone());
                server.request_shutdown(Box::new(move || {
                    confirmed.store(true, Ordering::SeqCst);
                }));
            }
            Some(ResourcePayload::Dummy) | None => {}
        }
        slot.deinited = true;

        if tag == HandleTag::Window {
            self.window_count -= 1;
            if self.active_window == Some(id) {
                self.active_window = self.live_windows().first().copied();
            }
        }
        debug!(id, ?tag, "resource deinit started");
    }

    /// Whether a server slot's shutdown has been confirmed by the native side.
    pub fn shutdown_confirmed(&self, id: ResourceId) -> bool {
        self.slot(id)
            .and_then(|s| s.shutdown_confirmed.as_ref())
            .map(|flag| flag.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// Frees a slot; this is the script-finalizer path.
    ///
    /// Runs `start_deinit` first if it has not happened, fires the
    /// `on_deinit` callback, frees the native object, unlinks the slot
    /// (fixing `last`), and drops the external back-pointer.
    pub fn destroy(&mut self, id: ResourceId) {
        if !self.contains(id) {
            return;
        }
        if !self.is_deinited(id) {
            self.start_deinit(id);
        }

        let tag = match self.slot_mut(id) {
            Some(slot) => {
                if let Some(callback) = slot.on_deinit.take() {
                    callback();
                }
                slot.payload = None;
                slot.tag
            }
            None => return,
        };

        self.unlink(tag, id);
        self.slots[id as usize] = None;
        self.free.push(id);
        debug!(id, ?tag, "resource destroyed");
    }

    /// Removes a slot and hands back its payload without destroying it.
    ///
    /// Used by dev-mode restart to carry a native window across runtime
    /// teardown. No teardown runs and `on_deinit` does not fire.
    pub fn detach(&mut self, id: ResourceId) -> Option<ResourcePayload> {
        let (tag, payload, deinited) = {
            let slot = self.slots.get_mut(id as usize)?.as_mut()?;
            (slot.tag, slot.payload.take()?, slot.deinited)
        };
        if tag == HandleTag::Window && !deinited {
            self.window_count -= 1;
            if self.active_window == Some(id) {
                self.active_window = None;
            }
        }
        self.unlink(tag, id);
        self.slots[id as usize] = None;
        self.free.push(id);
        if tag == HandleTag::Window && self.active_window.is_none() {
            self.active_window = self.live_windows().first().copied();
        }
        Some(payload)
    }

    fn unlink(&mut self, tag: HandleTag, id: ResourceId) {
        let head = self.list_for(tag).head;
        let mut prev = head;
        let mut cursor = self.slot(head).and_then(|s| s.next);
        while let Some(current) = cursor {
            if current == id {
                let next = self.slot(id).and_then(|s| s.next);
                if let Some(prev_slot) = self.slot_mut(prev) {
                    prev_slot.next = next;
                }
                let list = self.list_for(tag);
                if list.last == id {
                    list.last = prev;
                }
                return;
            }
            prev = current;
            cursor = self.slot(current).and_then(|s| s.next);
        }
    }
}

impl Default for ResourceTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct FakeWindow {
        destroyed: Rc<Cell<bool>>,
    }

    impl WindowResource for FakeWindow {
        fn platform_id(&self) -> u32 {
            0
        }
        fn destroy(&mut self) {
            self.destroyed.set(true);
        }
        fn frame_delay_ms(&self) -> u64 {
            16
        }
        fn end_frame(&mut self, _min_delay_ms: u64) {}
    }

    fn window(table: &mut ResourceTable) -> (ResourceId, Rc<Cell<bool>>) {
        let destroyed = Rc::new(Cell::new(false));
        let id = table.create(ResourcePayload::Window(Box::new(FakeWindow {
            destroyed: destroyed.clone(),
        })));
        (id, destroyed)
    }

    struct FakeServer;

    impl ServerResource for FakeServer {
        fn request_shutdown(&mut self, on_closed: Box<dyn FnOnce() + Send>) {
            // Confirms closure immediately.
            on_closed();
        }
    }

    #[test]
    fn external_back_pointer_matches_slot_id() {
        let mut table = ResourceTable::new();
        let (a, _) = window(&mut table);
        let b = table.create(ResourcePayload::Server(Box::new(FakeServer)));
        assert_eq!(table.external(a).unwrap().resource_id, a);
        assert_eq!(table.external(b).unwrap().resource_id, b);
    }

    #[test]
    fn first_window_becomes_active() {
        let mut table = ResourceTable::new();
        let (a, _) = window(&mut table);
        let (_b, _) = window(&mut table);
        assert_eq!(table.active_window(), Some(a));
        assert_eq!(table.window_count(), 2);
    }

    #[test]
    fn deinit_of_active_window_reelects() {
        let mut table = ResourceTable::new();
        let (a, destroyed_a) = window(&mut table);
        let (b, _) = window(&mut table);
        table.start_deinit(a);
        assert!(destroyed_a.get());
        assert_eq!(table.active_window(), Some(b));
        assert_eq!(table.window_count(), 1);
        // Slot remains until the finalizer path runs.
        assert!(table.contains(a));
        assert!(table.is_deinited(a));
    }

    #[test]
    fn deinit_of_last_window_clears_active() {
        let mut table = ResourceTable::new();
        let (a, _) = window(&mut table);
        table.start_deinit(a);
        assert_eq!(table.active_window(), None);
        assert_eq!(table.window_count(), 0);
    }

    #[test]
    fn destroy_without_deinit_runs_both_phases() {
        let mut table = ResourceTable::new();
        let (a, destroyed) = window(&mut table);
        let fired = Rc::new(Cell::new(0));
        let counter = fired.clone();
        table.set_on_deinit(a, Box::new(move || counter.set(counter.get() + 1)));

        table.destroy(a);
        assert!(destroyed.get());
        assert_eq!(fired.get(), 1);
        assert!(!table.contains(a));
        assert_eq!(table.window_count(), 0);
    }

    #[test]
    fn on_deinit_fires_exactly_once() {
        let mut table = ResourceTable::new();
        let (a, _) = window(&mut table);
        let fired = Rc::new(Cell::new(0));
        let counter = fired.clone();
        table.set_on_deinit(a, Box::new(move || counter.set(counter.get() + 1)));

        table.start_deinit(a);
        assert_eq!(fired.get(), 0);
        table.destroy(a);
        table.destroy(a);
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn unlink_fixes_last_pointer() {
        let mut table = ResourceTable::new();
        let (a, _) = window(&mut table);
        let (b, _) = window(&mut table);
        table.destroy(b);
        // Appending after removing the tail must link from the old tail.
        let (c, _) = window(&mut table);
        assert_eq!(table.live_windows(), vec![a, c]);
    }

    #[test]
    fn slot_ids_are_reused_after_destroy() {
        let mut table = ResourceTable::new();
        let (a, _) = window(&mut table);
        table.destroy(a);
        let (b, _) = window(&mut table);
        assert_eq!(a, b);
        assert_eq!(table.external(b).unwrap().resource_id, b);
    }

    #[test]
    fn server_shutdown_is_confirmed() {
        let mut table = ResourceTable::new();
        let id = table.create(ResourcePayload::Server(Box::new(FakeServer)));
        assert!(!table.shutdown_confirmed(id));
        table.start_deinit(id);
        assert!(table.shutdown_confirmed(id));
        table.destroy(id);
        assert_eq!(table.live_slots(), 0);
    }
}
