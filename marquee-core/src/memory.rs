use std::collections::HashMap;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;
use marquee_shared::{Event, NewEvent, Seat};
use crate::repository::{SeatStore, StoreResult};

struct EventRecord {
    id: Uuid,
    title: String,
    date: DateTime<Utc>,
    seat_ids: Vec<Uuid>,
}

#[derive(Default)]
struct Inner {
    events: HashMap<Uuid, EventRecord>,
    seats: HashMap<Uuid, Seat>,
}

/// In-memory seat store for tests and local runs.
///
/// Every operation runs under one `RwLock`, which gives the same atomicity
/// the Postgres store gets from single-statement updates.
#[derive(Default)]
pub struct InMemorySeatStore {
    inner: RwLock<Inner>,
}

impl InMemorySeatStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SeatStore for InMemorySeatStore {
    async fn create_event(&self, new_event: &NewEvent) -> StoreResult<Event> {
        let event_id = Uuid::new_v4();
        let seats: Vec<Seat> = (1..=new_event.total_seats)
            .map(|position| Seat::new(event_id, position))
            .collect();

        let mut inner = self.inner.write().await;
        inner.events.insert(event_id, EventRecord {
            id: event_id,
            title: new_event.title.clone(),
            date: new_event.date,
            seat_ids: seats.iter().map(|s| s.id).collect(),
        });
        for seat in &seats {
            inner.seats.insert(seat.id, seat.clone());
        }

        Ok(Event {
            id: event_id,
            title: new_event.title.clone(),
            date: new_event.date,
            total_seats: new_event.total_seats,
            seats,
        })
    }

    async fn get_event(&self, id: Uuid) -> StoreResult<Option<Event>> {
        let inner = self.inner.read().await;
        let Some(record) = inner.events.get(&id) else {
            return Ok(None);
        };

        let seats = record
            .seat_ids
            .iter()
            .filter_map(|seat_id| inner.seats.get(seat_id).cloned())
            .collect();

        Ok(Some(Event {
            id: record.id,
            title: record.title.clone(),
            date: record.date,
            total_seats: record.seat_ids.len() as i32,
            seats,
        }))
    }

    async fn get_seat(&self, id: Uuid) -> StoreResult<Option<Seat>> {
        Ok(self.inner.read().await.seats.get(&id).cloned())
    }

    async fn try_book(&self, id: Uuid, booked_at: DateTime<Utc>) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        let seat = inner.seats.get_mut(&id).ok_or_else(|| format!("seat {} not found", id))?;

        if seat.booked || seat.paid {
            return Ok(false);
        }
        seat.booked = true;
        seat.booked_at = Some(booked_at);
        Ok(true)
    }

    async fn set_booked(&self, id: Uuid, booked: bool) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let seat = inner.seats.get_mut(&id).ok_or_else(|| format!("seat {} not found", id))?;

        seat.booked = booked;
        if !booked {
            seat.booked_at = None;
        }
        Ok(())
    }

    async fn release_if_unpaid(&self, id: Uuid) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        let seat = inner.seats.get_mut(&id).ok_or_else(|| format!("seat {} not found", id))?;

        if seat.paid {
            return Ok(false);
        }
        seat.booked = false;
        seat.booked_at = None;
        Ok(true)
    }

    async fn set_paid(&self, id: Uuid) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let seat = inner.seats.get_mut(&id).ok_or_else(|| format!("seat {} not found", id))?;

        seat.paid = true;
        seat.booked = true;
        Ok(())
    }
}
