use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;
use marquee_core::HeldSeat;
use marquee_shared::{EventView, NewEvent, Seat, SeatIndexRequest};
use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events", post(create_event))
        .route("/events/{id}", get(get_event))
        .route("/events/{id}/book", post(book_seat))
        .route("/events/{id}/confirm", post(confirm_seat))
        .route("/metrics", get(metrics))
        .route("/health", get(health))
}

async fn create_event(
    State(state): State<AppState>,
    Json(req): Json<NewEvent>,
) -> Result<(StatusCode, Json<EventView>), AppError> {
    let event = state.booking.create_event(req).await?;
    Ok((StatusCode::CREATED, Json(EventView::from(&event))))
}

async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<EventView>, AppError> {
    Ok(Json(state.booking.event_view(event_id).await?))
}

async fn book_seat(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Json(req): Json<SeatIndexRequest>,
) -> Result<Json<HeldSeat>, AppError> {
    let held = state.booking.hold_seat_at(event_id, req.seat_index).await?;
    Ok(Json(held))
}

async fn confirm_seat(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Json(req): Json<SeatIndexRequest>,
) -> Result<Json<Seat>, AppError> {
    let seat = state.booking.confirm_seat_at(event_id, req.seat_index).await?;
    Ok(Json(seat))
}

async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let body = state
        .engine()
        .metrics()
        .render()
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "active_holds": state.engine().registry().len(),
    }))
}
