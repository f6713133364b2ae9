pub mod repository;
pub mod signal;
pub mod registry;
pub mod expiry;
pub mod intake;
pub mod metrics;
pub mod engine;
pub mod booking;
pub mod memory;

pub use booking::{BookingService, HeldSeat};
pub use engine::{HoldEngine, HoldSettings};
pub use expiry::{ExpiryOutcome, ExpiryWorker, Hold};
pub use memory::InMemorySeatStore;
pub use registry::ReservationRegistry;
pub use repository::{SeatStore, StoreResult};
pub use signal::{cancel_channel, CancelHandle, CancelSignal, Interrupt};

/// Largest event the booking service will create
pub const MAX_SEATS_PER_EVENT: i32 = 10_000;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Seat number {index} out of range (1..={total})")]
    OutOfRange { index: i32, total: i32 },
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Seat store unavailable: {0}")]
    StoreError(String),
    #[error("Booking intake queue is closed")]
    QueueClosed,
    #[error("Internal service error: {0}")]
    InternalError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
