pub mod models;

pub use models::event::{Event, EventView, NewEvent, Seat, SeatIndexRequest, SeatStatus, SeatView};
pub use models::events::{HoldEvent, HoldEventKind};
