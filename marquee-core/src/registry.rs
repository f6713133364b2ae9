use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;
use tracing::{info, warn};
use crate::signal::CancelHandle;

struct Entry {
    hold_id: Uuid,
    handle: CancelHandle,
}

/// In-memory map from seat id to the cancel handle of that seat's pending
/// expiry.
///
/// An entry exists only while a hold is waiting on its grace timer. Every
/// operation takes the same lock for a single map access; no timer wait or
/// I/O ever happens while it is held.
#[derive(Default)]
pub struct ReservationRegistry {
    timers: Mutex<HashMap<Uuid, Entry>>,
}

impl ReservationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn timers(&self) -> MutexGuard<'_, HashMap<Uuid, Entry>> {
        // A panic elsewhere cannot leave a half-written entry behind
        self.timers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Insert or replace the handle for a seat.
    ///
    /// Callers must make sure any previous worker for the seat has exited.
    pub fn register(&self, seat_id: Uuid, hold_id: Uuid, handle: CancelHandle) {
        let previous = self.timers().insert(seat_id, Entry { hold_id, handle });

        if let Some(stale) = previous {
            warn!("Replaced registry entry for seat {} (stale hold {})", seat_id, stale.hold_id);
        }
    }

    /// Signal the pending expiry for a seat.
    ///
    /// Returns false when there is no active hold, or when the worker is
    /// already finishing through its timer path.
    pub fn cancel(&self, seat_id: Uuid) -> bool {
        let handle = match self.timers().get(&seat_id) {
            Some(entry) => entry.handle.clone(),
            None => {
                info!("No active timer for seat {}", seat_id);
                return false;
            }
        };

        if handle.cancel() {
            info!("Cancelled timer for seat {}", seat_id);
            true
        } else {
            info!("Timer for seat {} already resolving", seat_id);
            false
        }
    }

    /// Unconditional, idempotent removal
    pub fn remove(&self, seat_id: Uuid) {
        self.timers().remove(&seat_id);
    }

    /// Remove the entry only if it still belongs to `hold_id`.
    ///
    /// This is the worker's exit path, so a late worker can never evict the
    /// entry of a newer hold on the same seat.
    pub fn remove_hold(&self, seat_id: Uuid, hold_id: Uuid) -> bool {
        let mut timers = self.timers();
        match timers.get(&seat_id) {
            Some(entry) if entry.hold_id == hold_id => {
                timers.remove(&seat_id);
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, seat_id: Uuid) -> bool {
        self.timers().contains_key(&seat_id)
    }

    pub fn hold_id(&self, seat_id: Uuid) -> Option<Uuid> {
        self.timers().get(&seat_id).map(|e| e.hold_id)
    }

    pub fn len(&self) -> usize {
        self.timers().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tear down: remove every entry and tell each live worker to stop
    /// without rolling back. Returns the number of entries removed.
    pub fn drain(&self) -> usize {
        let drained: Vec<Entry> = self.timers().drain().map(|(_, e)| e).collect();

        for entry in &drained {
            entry.handle.teardown();
        }

        drained.len()
    }
}
