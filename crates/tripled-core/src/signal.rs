//! Change notifications.
//!
//! The engine reports graph changes through [`Signal`]s. A slot is a closure
//! taking the payload by reference; `emit` calls every slot right away on the
//! caller's thread, oldest connection first.
//!
//! ```
//! use tripled_core::Signal;
//!
//! let inserted = Signal::<String>::new();
//! let id = inserted.connect(|reference| println!("inserted {reference}"));
//! inserted.emit("a".to_string());
//! assert!(inserted.disconnect(id));
//! ```

use std::sync::Arc;

use parking_lot::Mutex;

use crate::logging::targets;

/// Handle of one connected slot, unique within its signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

struct Slots<Args> {
    next_id: u64,
    entries: Vec<(ConnectionId, Slot<Args>)>,
}

/// Ordered list of slots notified on every [`emit`](Signal::emit).
///
/// The slot list is copied before delivery, so a slot may connect or
/// disconnect slots of the same signal; the change applies from the next
/// emit on.
pub struct Signal<Args> {
    slots: Mutex<Slots<Args>>,
}

impl<Args: 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: 'static> Signal<Args> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(Slots {
                next_id: 0,
                entries: Vec::new(),
            }),
        }
    }

    /// Append a slot.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let mut slots = self.slots.lock();
        let id = ConnectionId(slots.next_id);
        slots.next_id += 1;
        slots.entries.push((id, Arc::new(slot)));
        id
    }

    /// Remove a slot. Returns `false` if `id` was not connected.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        let mut slots = self.slots.lock();
        let before = slots.entries.len();
        slots.entries.retain(|(connected, _)| *connected != id);
        slots.entries.len() != before
    }

    pub fn connection_count(&self) -> usize {
        self.slots.lock().entries.len()
    }

    /// Deliver `args` to every slot.
    pub fn emit(&self, args: Args) {
        let slots: Vec<Slot<Args>> = self
            .slots
            .lock()
            .entries
            .iter()
            .map(|(_, slot)| Arc::clone(slot))
            .collect();
        tracing::trace!(target: targets::SIGNAL, slots = slots.len(), "emit");
        for slot in slots {
            slot(&args);
        }
    }
}

static_assertions::assert_impl_all!(Signal<()>: Send, Sync);

impl<Args: 'static> std::fmt::Debug for Signal<Args> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("connections", &self.connection_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Change {
        reference: &'static str,
        value: &'static str,
    }

    fn recorder(signal: &Signal<Change>, label: &'static str) -> (ConnectionId, Arc<Mutex<Vec<String>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        let id = signal.connect(move |change: &Change| {
            sink.lock().push(format!("{label}:{}={}", change.reference, change.value));
        });
        (id, log)
    }

    #[test]
    fn test_slots_run_in_connection_order() {
        let signal = Signal::<Change>::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for label in ["view", "cache", "audit"] {
            let order = order.clone();
            signal.connect(move |_| order.lock().push(label));
        }

        signal.emit(Change { reference: "a", value: "1" });

        assert_eq!(*order.lock(), vec!["view", "cache", "audit"]);
    }

    #[test]
    fn test_reconnected_slot_goes_last() {
        let signal = Signal::<Change>::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut ids = Vec::new();
        for label in ["first", "second", "third"] {
            let order = order.clone();
            ids.push(signal.connect(move |_| order.lock().push(label)));
        }

        assert!(signal.disconnect(ids[0]));
        let sink = order.clone();
        let late = signal.connect(move |_| sink.lock().push("late"));
        signal.emit(Change { reference: "a", value: "1" });

        assert_eq!(*order.lock(), vec!["second", "third", "late"]);
        assert_ne!(late, ids[0]);
        assert_eq!(signal.connection_count(), 3);
    }

    #[test]
    fn test_disconnected_slot_misses_later_changes() {
        let signal = Signal::<Change>::new();
        let (id, log) = recorder(&signal, "row");

        signal.emit(Change { reference: "tea", value: "1" });
        assert!(signal.disconnect(id));
        assert!(!signal.disconnect(id));
        signal.emit(Change { reference: "tea", value: "2" });

        assert_eq!(*log.lock(), vec!["row:tea=1"]);
    }

    #[test]
    fn test_slot_connected_during_emit_waits_for_next() {
        let signal = Arc::new(Signal::<Change>::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        let weak = Arc::downgrade(&signal);
        let sink = log.clone();
        signal.connect(move |change: &Change| {
            if change.reference == "first" {
                if let Some(signal) = weak.upgrade() {
                    let sink = sink.clone();
                    signal.connect(move |change: &Change| sink.lock().push(change.reference));
                }
            }
        });

        signal.emit(Change { reference: "first", value: "" });
        assert!(log.lock().is_empty());
        signal.emit(Change { reference: "second", value: "" });
        assert_eq!(*log.lock(), vec!["second"]);
    }
}
