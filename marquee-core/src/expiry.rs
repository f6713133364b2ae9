use std::sync::Arc;
use std::time::Duration;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use uuid::Uuid;
use marquee_shared::{HoldEvent, HoldEventKind};
use crate::metrics::HoldMetrics;
use crate::registry::ReservationRegistry;
use crate::repository::SeatStore;
use crate::signal::{cancel_channel, CancelHandle, CancelSignal, Interrupt};

/// A freshly booked, unpaid seat on its way to an expiry worker
#[derive(Debug)]
pub struct Hold {
    pub seat_id: Uuid,
    pub hold_id: Uuid,
    pub booked_at: DateTime<Utc>,
    pub handle: CancelHandle,
    pub signal: CancelSignal,
}

impl Hold {
    pub fn new(seat_id: Uuid, booked_at: DateTime<Utc>) -> Self {
        let (handle, signal) = cancel_channel();
        Self {
            seat_id,
            hold_id: Uuid::new_v4(),
            booked_at,
            handle,
            signal,
        }
    }
}

/// How a hold's timer ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryOutcome {
    /// Payment signalled before the grace period elapsed
    Cancelled,
    /// Grace period elapsed unpaid; seat rolled back to free
    Released,
    /// Grace period elapsed but the store already had the seat paid
    AlreadyPaid,
    /// Grace period elapsed and the rollback could not be applied
    RollbackFailed,
    /// Registry torn down; the store is left as is
    ShutDown,
}

impl From<ExpiryOutcome> for HoldEventKind {
    fn from(outcome: ExpiryOutcome) -> Self {
        match outcome {
            ExpiryOutcome::Cancelled => HoldEventKind::Cancelled,
            ExpiryOutcome::Released => HoldEventKind::Released,
            ExpiryOutcome::AlreadyPaid => HoldEventKind::AlreadyPaid,
            ExpiryOutcome::RollbackFailed => HoldEventKind::RollbackFailed,
            ExpiryOutcome::ShutDown => HoldEventKind::ShutDown,
        }
    }
}

/// Waits out one hold's grace period.
///
/// Cheap to clone: one clone is moved into each spawned task.
#[derive(Clone)]
pub struct ExpiryWorker {
    store: Arc<dyn SeatStore>,
    registry: Arc<ReservationRegistry>,
    metrics: HoldMetrics,
    events: broadcast::Sender<HoldEvent>,
    grace: Duration,
    min_wait: Duration,
}

impl ExpiryWorker {
    pub fn new(
        store: Arc<dyn SeatStore>,
        registry: Arc<ReservationRegistry>,
        metrics: HoldMetrics,
        events: broadcast::Sender<HoldEvent>,
        grace: Duration,
        min_wait: Duration,
    ) -> Self {
        Self { store, registry, metrics, events, grace, min_wait }
    }

    /// Time left before the hold expires, measured from `booked_at`.
    ///
    /// Never zero: an overdue hold still waits `min_wait` so a payment that
    /// just arrived gets a last chance. Never longer than `grace`, even when
    /// `booked_at` lies in the future after a clock step.
    pub fn remaining(&self, booked_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
        let elapsed = now.signed_duration_since(booked_at);
        let left = chrono::Duration::from_std(self.grace)
            .ok()
            .and_then(|grace| grace.checked_sub(&elapsed))
            .and_then(|left| left.to_std().ok());

        match left {
            Some(left) if !left.is_zero() => left.min(self.grace),
            _ => self.min_wait,
        }
    }

    pub(crate) fn publish(&self, seat_id: Uuid, hold_id: Uuid, kind: HoldEventKind) {
        self.metrics.record(kind);
        // No subscribers is fine
        let _ = self.events.send(HoldEvent {
            seat_id,
            hold_id,
            kind,
            timestamp: Utc::now().timestamp_millis(),
        });
    }

    /// Run the hold to completion. The registry entry for this hold is gone
    /// by the time this returns, whatever the outcome.
    pub async fn run(self, hold: Hold) -> ExpiryOutcome {
        let Hold { seat_id, hold_id, booked_at, handle, mut signal } = hold;

        let wait = self.remaining(booked_at, Utc::now());
        info!("Timer for seat {} started, time to wait: {:?}", seat_id, wait);

        let outcome = tokio::select! {
            Some(interrupt) = signal.recv() => match interrupt {
                Interrupt::Cancel => {
                    info!("Hold on seat {} was paid", seat_id);
                    ExpiryOutcome::Cancelled
                }
                Interrupt::Teardown => {
                    info!("Hold on seat {} abandoned at shutdown", seat_id);
                    ExpiryOutcome::ShutDown
                }
            },
            _ = tokio::time::sleep(wait) => {
                // From here on a cancel reports false to its caller
                signal.close();
                self.expire(seat_id).await
            }
        };

        signal.close();
        self.registry.remove_hold(seat_id, hold_id);
        drop(handle);

        self.publish(seat_id, hold_id, outcome.into());
        outcome
    }

    /// Timer path: re-read payment state from the store and roll back only
    /// if the seat is still unpaid.
    async fn expire(&self, seat_id: Uuid) -> ExpiryOutcome {
        info!("Hold on seat {} timed out", seat_id);

        let seat = match self.store.get_seat(seat_id).await {
            Ok(Some(seat)) => seat,
            Ok(None) => {
                error!("Seat {} vanished from the store before rollback", seat_id);
                return ExpiryOutcome::RollbackFailed;
            }
            Err(e) => {
                error!("Error getting seat {} from the store: {}", seat_id, e);
                return ExpiryOutcome::RollbackFailed;
            }
        };

        if seat.paid {
            info!("Seat {} already paid, nothing to release", seat_id);
            return ExpiryOutcome::AlreadyPaid;
        }

        match self.store.release_if_unpaid(seat_id).await {
            Ok(true) => {
                info!("Released hold on seat {}", seat_id);
                ExpiryOutcome::Released
            }
            Ok(false) => {
                warn!("Payment for seat {} landed during rollback, keeping hold", seat_id);
                ExpiryOutcome::AlreadyPaid
            }
            Err(e) => {
                error!("Rollback failed for seat {}, left held for reconciliation: {}", seat_id, e);
                ExpiryOutcome::RollbackFailed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemorySeatStore;
    use marquee_shared::NewEvent;

    fn worker_with(store: Arc<dyn SeatStore>, grace: Duration) -> (ExpiryWorker, Arc<ReservationRegistry>) {
        let registry = Arc::new(ReservationRegistry::new());
        let (events, _) = broadcast::channel(16);
        let worker = ExpiryWorker::new(
            store,
            registry.clone(),
            HoldMetrics::new().unwrap(),
            events,
            grace,
            Duration::from_millis(5),
        );
        (worker, registry)
    }

    async fn booked_seat(store: &InMemorySeatStore) -> (Uuid, DateTime<Utc>) {
        let event = store
            .create_event(&NewEvent { title: "Gala".to_string(), date: Utc::now(), total_seats: 1 })
            .await
            .unwrap();
        let now = Utc::now();
        store.try_book(event.seats[0].id, now).await.unwrap();
        (event.seats[0].id, now)
    }

    #[test]
    fn test_remaining_is_measured_from_booked_at() {
        let store: Arc<dyn SeatStore> = Arc::new(InMemorySeatStore::new());
        let (worker, _) = worker_with(store, Duration::from_secs(10));
        let now = Utc::now();

        let left = worker.remaining(now - chrono::Duration::seconds(4), now);
        assert_eq!(left, Duration::from_secs(6));
    }

    #[test]
    fn test_overdue_hold_waits_minimum() {
        let store: Arc<dyn SeatStore> = Arc::new(InMemorySeatStore::new());
        let (worker, _) = worker_with(store, Duration::from_secs(10));
        let now = Utc::now();

        assert_eq!(worker.remaining(now - chrono::Duration::seconds(30), now), Duration::from_millis(5));
        assert_eq!(worker.remaining(now - chrono::Duration::seconds(10), now), Duration::from_millis(5));
    }

    #[test]
    fn test_future_booking_never_lengthens_hold() {
        let store: Arc<dyn SeatStore> = Arc::new(InMemorySeatStore::new());
        let (worker, _) = worker_with(store, Duration::from_secs(10));
        let now = Utc::now();

        assert_eq!(worker.remaining(now + chrono::Duration::seconds(5), now), Duration::from_secs(10));
        assert_eq!(worker.remaining(now, now), Duration::from_secs(10));
        assert_eq!(worker.remaining(now - chrono::Duration::seconds(4), now), Duration::from_secs(6));
    }

    #[tokio::test]
    async fn test_expiry_releases_unpaid_seat() {
        let store = Arc::new(InMemorySeatStore::new());
        let (seat_id, booked_at) = booked_seat(&store).await;
        let (worker, registry) = worker_with(store.clone(), Duration::from_millis(20));

        let hold = Hold::new(seat_id, booked_at);
        registry.register(seat_id, hold.hold_id, hold.handle.clone());

        assert_eq!(worker.run(hold).await, ExpiryOutcome::Released);
        assert!(!registry.contains(seat_id));

        let seat = store.get_seat(seat_id).await.unwrap().unwrap();
        assert!(!seat.booked && !seat.paid);
    }

    #[tokio::test]
    async fn test_cancel_keeps_hold() {
        let store = Arc::new(InMemorySeatStore::new());
        let (seat_id, booked_at) = booked_seat(&store).await;
        let (worker, registry) = worker_with(store.clone(), Duration::from_secs(5));

        let hold = Hold::new(seat_id, booked_at);
        registry.register(seat_id, hold.hold_id, hold.handle.clone());
        let task = tokio::spawn(worker.run(hold));

        store.set_paid(seat_id).await.unwrap();
        assert!(registry.cancel(seat_id));

        assert_eq!(task.await.unwrap(), ExpiryOutcome::Cancelled);
        assert!(!registry.contains(seat_id));
        let seat = store.get_seat(seat_id).await.unwrap().unwrap();
        assert!(seat.booked && seat.paid);
    }

    #[tokio::test]
    async fn test_expiry_finds_paid_seat_on_reread() {
        let store = Arc::new(InMemorySeatStore::new());
        let (seat_id, booked_at) = booked_seat(&store).await;
        let (worker, registry) = worker_with(store.clone(), Duration::from_millis(10));

        // Paid in the store, but nobody signalled the worker
        store.set_paid(seat_id).await.unwrap();
        let hold = Hold::new(seat_id, booked_at);
        registry.register(seat_id, hold.hold_id, hold.handle.clone());

        assert_eq!(worker.run(hold).await, ExpiryOutcome::AlreadyPaid);
        assert!(!registry.contains(seat_id));
        assert!(store.get_seat(seat_id).await.unwrap().unwrap().booked);
    }

    #[tokio::test]
    async fn test_missing_seat_fails_rollback_and_cleans_registry() {
        let store: Arc<dyn SeatStore> = Arc::new(InMemorySeatStore::new());
        let (worker, registry) = worker_with(store, Duration::from_millis(5));
        let seat_id = Uuid::new_v4();

        let hold = Hold::new(seat_id, Utc::now());
        registry.register(seat_id, hold.hold_id, hold.handle.clone());

        assert_eq!(worker.run(hold).await, ExpiryOutcome::RollbackFailed);
        assert!(registry.is_empty());
    }
}
