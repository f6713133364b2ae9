use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use marquee_shared::{Event, NewEvent, Seat};

pub type StoreResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Durable record of events and seats.
///
/// Implementations are externally synchronized: each call is applied with the
/// store's own transactional isolation. The hold engine never holds a lock
/// across any of these calls.
#[async_trait]
pub trait SeatStore: Send + Sync {
    /// Insert an event together with all of its seats, atomically
    async fn create_event(&self, event: &NewEvent) -> StoreResult<Event>;

    /// Fetch an event with its seats ordered by position
    async fn get_event(&self, id: Uuid) -> StoreResult<Option<Event>>;

    async fn get_seat(&self, id: Uuid) -> StoreResult<Option<Seat>>;

    /// Set `booked=true` only if the seat is neither booked nor paid.
    /// Returns false when the condition did not hold.
    async fn try_book(&self, id: Uuid, booked_at: DateTime<Utc>) -> StoreResult<bool>;

    async fn set_booked(&self, id: Uuid, booked: bool) -> StoreResult<()>;

    /// Roll a hold back (`booked=false`) only if the seat is still unpaid.
    /// Returns false when a payment got there first.
    async fn release_if_unpaid(&self, id: Uuid) -> StoreResult<bool>;

    /// Mark the seat paid. A paid seat is always booked, so this sets both
    /// flags. Idempotent: marking an already paid seat succeeds.
    async fn set_paid(&self, id: Uuid) -> StoreResult<()>;
}
