use std::sync::Arc;
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;
use marquee_shared::{Event, EventView, NewEvent, Seat};
use crate::engine::HoldEngine;
use crate::expiry::Hold;
use crate::repository::SeatStore;
use crate::signal::CancelHandle;
use crate::{CoreError, CoreResult, MAX_SEATS_PER_EVENT};

/// Result of a successful hold request
#[derive(Debug, Clone, Serialize)]
pub struct HeldSeat {
    pub seat: Seat,
    pub hold_id: Uuid,
    /// Handle to this hold's pending expiry. Once the hold resolves, it is
    /// inert and can never touch a later hold on the same seat.
    #[serde(skip)]
    pub handle: CancelHandle,
}

/// Entry points used by the request boundary
#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn SeatStore>,
    engine: HoldEngine,
}

fn store_error(e: Box<dyn std::error::Error + Send + Sync>) -> CoreError {
    CoreError::StoreError(e.to_string())
}

impl BookingService {
    pub fn new(store: Arc<dyn SeatStore>, engine: HoldEngine) -> Self {
        Self { store, engine }
    }

    pub fn engine(&self) -> &HoldEngine {
        &self.engine
    }

    pub async fn create_event(&self, new_event: NewEvent) -> CoreResult<Event> {
        if new_event.title.trim().is_empty() {
            return Err(CoreError::ValidationError("title must not be empty".to_string()));
        }
        if new_event.total_seats < 1 || new_event.total_seats > MAX_SEATS_PER_EVENT {
            return Err(CoreError::ValidationError(format!(
                "amount_of_seats must be between 1 and {}",
                MAX_SEATS_PER_EVENT
            )));
        }

        let event = self.store.create_event(&new_event).await.map_err(store_error)?;
        info!("Event {} created with {} seats", event.id, event.total_seats);
        Ok(event)
    }

    pub async fn get_event(&self, event_id: Uuid) -> CoreResult<Event> {
        self.store
            .get_event(event_id)
            .await
            .map_err(store_error)?
            .ok_or_else(|| CoreError::NotFound(format!("event {}", event_id)))
    }

    pub async fn event_view(&self, event_id: Uuid) -> CoreResult<EventView> {
        let event = self.get_event(event_id).await?;
        Ok(EventView::from(&event))
    }

    /// Resolve a 1-based seat index, rejecting anything outside the event
    pub async fn seat_at(&self, event_id: Uuid, seat_index: i32) -> CoreResult<Seat> {
        let event = self.get_event(event_id).await?;
        event
            .seat_at(seat_index)
            .cloned()
            .ok_or(CoreError::OutOfRange { index: seat_index, total: event.total_seats })
    }

    pub async fn hold_seat_at(&self, event_id: Uuid, seat_index: i32) -> CoreResult<HeldSeat> {
        let seat = self.seat_at(event_id, seat_index).await?;
        self.hold(seat).await
    }

    pub async fn hold_seat(&self, seat_id: Uuid) -> CoreResult<HeldSeat> {
        let seat = self.find_seat(seat_id).await?;
        self.hold(seat).await
    }

    /// Mark the seat booked, then hand it to the intake queue. Returns as soon
    /// as the hold is persisted and queued.
    async fn hold(&self, seat: Seat) -> CoreResult<HeldSeat> {
        if seat.booked || seat.paid {
            return Err(CoreError::Conflict("seat already booked".to_string()));
        }

        let booked_at = Utc::now();
        if !self.store.try_book(seat.id, booked_at).await.map_err(store_error)? {
            return Err(CoreError::Conflict("seat already booked".to_string()));
        }

        let hold = Hold::new(seat.id, booked_at);
        let held = HeldSeat {
            seat: Seat { booked: true, booked_at: Some(booked_at), ..seat },
            hold_id: hold.hold_id,
            handle: hold.handle.clone(),
        };

        if let Err(e) = self.engine.submit(hold).await {
            // No timer will ever run for this hold, so undo it here
            if let Err(rollback) = self.store.set_booked(held.seat.id, false).await {
                error!("Failed to undo hold on seat {} after intake error: {}", held.seat.id, rollback);
            }
            return Err(e);
        }

        info!("Seat {} held (hold {})", held.seat.id, held.hold_id);
        Ok(held)
    }

    pub async fn confirm_seat_at(&self, event_id: Uuid, seat_index: i32) -> CoreResult<Seat> {
        let seat = self.seat_at(event_id, seat_index).await?;
        self.confirm(seat).await
    }

    pub async fn confirm_seat(&self, seat_id: Uuid) -> CoreResult<Seat> {
        let seat = self.find_seat(seat_id).await?;
        self.confirm(seat).await
    }

    /// Persist the payment, then cancel the pending expiry. Succeeds whether
    /// or not a timer was still waiting.
    async fn confirm(&self, seat: Seat) -> CoreResult<Seat> {
        self.store.set_paid(seat.id).await.map_err(store_error)?;

        if !self.engine.cancel(seat.id) {
            info!("Payment for seat {} found no pending expiry", seat.id);
        }

        Ok(Seat { booked: true, paid: true, ..seat })
    }

    async fn find_seat(&self, seat_id: Uuid) -> CoreResult<Seat> {
        self.store
            .get_seat(seat_id)
            .await
            .map_err(store_error)?
            .ok_or_else(|| CoreError::NotFound(format!("seat {}", seat_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::HoldSettings;
    use crate::memory::InMemorySeatStore;
    use std::time::Duration;

    async fn service() -> BookingService {
        let store: Arc<dyn SeatStore> = Arc::new(InMemorySeatStore::new());
        let settings = HoldSettings { grace: Duration::from_secs(30), ..HoldSettings::default() };
        let engine = HoldEngine::start(store.clone(), settings).unwrap();
        BookingService::new(store, engine)
    }

    fn new_event(seats: i32) -> NewEvent {
        NewEvent { title: "Matinee".to_string(), date: Utc::now(), total_seats: seats }
    }

    #[tokio::test]
    async fn test_held_seat_serializes_without_handle() {
        let service = service().await;
        let event = service.create_event(new_event(1)).await.unwrap();

        let held = service.hold_seat(event.seats[0].id).await.unwrap();
        let json = serde_json::to_value(&held).unwrap();

        assert_eq!(json["hold_id"], held.hold_id.to_string());
        assert_eq!(json["seat"]["booked"], true);
        assert!(json.get("handle").is_none());
    }

    #[tokio::test]
    async fn test_confirm_by_seat_id_marks_paid() {
        let service = service().await;
        let event = service.create_event(new_event(2)).await.unwrap();
        let seat_id = event.seats[1].id;

        service.hold_seat(seat_id).await.unwrap();
        let seat = service.confirm_seat(seat_id).await.unwrap();
        assert!(seat.booked && seat.paid);

        let view = service.event_view(event.id).await.unwrap();
        assert_eq!(view.available_seats, 1);

        let missing = service.confirm_seat(Uuid::new_v4()).await;
        assert!(matches!(missing, Err(CoreError::NotFound(_))));
    }
}
