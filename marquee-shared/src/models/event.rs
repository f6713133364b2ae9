use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

/// Display status of a seat, derived from its `booked`/`paid` flags
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SeatStatus {
    Free,
    Reserved,
    Paid,
}

/// Durable record of a single seat
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Seat {
    pub id: Uuid,
    pub event_id: Uuid,
    /// 1-based index of the seat within its event
    pub position: i32,
    pub booked: bool,
    pub paid: bool,
    pub booked_at: Option<DateTime<Utc>>,
}

impl Seat {
    pub fn new(event_id: Uuid, position: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id,
            position,
            booked: false,
            paid: false,
            booked_at: None,
        }
    }

    pub fn status(&self) -> SeatStatus {
        if self.paid {
            SeatStatus::Paid
        } else if self.booked {
            SeatStatus::Reserved
        } else {
            SeatStatus::Free
        }
    }

    pub fn is_free(&self) -> bool {
        self.status() == SeatStatus::Free
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub date: DateTime<Utc>,
    #[serde(rename = "amount_of_seats")]
    pub total_seats: i32,
    pub seats: Vec<Seat>,
}

impl Event {
    /// Look up a seat by its 1-based index
    pub fn seat_at(&self, index: i32) -> Option<&Seat> {
        if index < 1 || index > self.total_seats {
            return None;
        }
        self.seats.get((index - 1) as usize)
    }

    pub fn available_seats(&self) -> usize {
        self.seats.iter().filter(|s| s.is_free()).count()
    }
}

/// Input for event creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub date: DateTime<Utc>,
    #[serde(rename = "amount_of_seats")]
    pub total_seats: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatIndexRequest {
    pub seat_index: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeatView {
    pub index: i32,
    pub status: SeatStatus,
}

/// Read model returned by `GET /events/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventView {
    pub id: Uuid,
    pub title: String,
    pub date: DateTime<Utc>,
    pub amount_of_seats: i32,
    pub available_seats: usize,
    pub seats: Vec<SeatView>,
}

impl From<&Event> for EventView {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id,
            title: event.title.clone(),
            date: event.date,
            amount_of_seats: event.total_seats,
            available_seats: event.available_seats(),
            seats: event
                .seats
                .iter()
                .map(|s| SeatView { index: s.position, status: s.status() })
                .collect(),
        }
    }
}
