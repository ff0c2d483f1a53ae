//! Reservation endpoints for the requesting user.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use booking::{
    NewReservation, Notifier, ReservationChange, ReservationCreated, ReservationDetails,
    ReservationList, ReservationUpdated, Ticket,
};
use common::{EventId, ReservationId};
use domain::Reservation;
use store::BookingStore;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::Requester;
use crate::routes::parse_id;

/// POST /events/{id}/reservations
#[tracing::instrument(skip(state, request))]
pub async fn create<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Path(event_id): Path<String>,
    Requester(user_id): Requester,
    Json(request): Json<NewReservation>,
) -> Result<(StatusCode, Json<ReservationCreated>), ApiError>
where
    S: BookingStore + Clone + 'static,
    N: Notifier + 'static,
{
    let event_id: EventId = parse_id("event", &event_id)?;
    let created = state
        .reservations
        .create(user_id, event_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /reservations
#[tracing::instrument(skip(state))]
pub async fn list<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Requester(user_id): Requester,
) -> Result<Json<ReservationList>, ApiError>
where
    S: BookingStore + Clone + 'static,
    N: Notifier + 'static,
{
    Ok(Json(state.reservations.list(user_id).await?))
}

/// GET /reservations/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Path(id): Path<String>,
    Requester(user_id): Requester,
) -> Result<Json<ReservationDetails>, ApiError>
where
    S: BookingStore + Clone + 'static,
    N: Notifier + 'static,
{
    let id: ReservationId = parse_id("reservation", &id)?;
    Ok(Json(state.reservations.detail(user_id, id).await?))
}

/// PUT /reservations/{id}
#[tracing::instrument(skip(state, change))]
pub async fn update<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Path(id): Path<String>,
    Requester(user_id): Requester,
    Json(change): Json<ReservationChange>,
) -> Result<Json<ReservationUpdated>, ApiError>
where
    S: BookingStore + Clone + 'static,
    N: Notifier + 'static,
{
    let id: ReservationId = parse_id("reservation", &id)?;
    Ok(Json(state.reservations.update(user_id, id, change).await?))
}

/// POST /reservations/{id}/cancel
#[tracing::instrument(skip(state))]
pub async fn cancel<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Path(id): Path<String>,
    Requester(user_id): Requester,
) -> Result<Json<Reservation>, ApiError>
where
    S: BookingStore + Clone + 'static,
    N: Notifier + 'static,
{
    let id: ReservationId = parse_id("reservation", &id)?;
    Ok(Json(state.reservations.cancel(user_id, id).await?))
}

/// POST /reservations/{id}/resend-confirmation
#[tracing::instrument(skip(state))]
pub async fn resend_confirmation<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Path(id): Path<String>,
    Requester(user_id): Requester,
) -> Result<Json<Ticket>, ApiError>
where
    S: BookingStore + Clone + 'static,
    N: Notifier + 'static,
{
    let id: ReservationId = parse_id("reservation", &id)?;
    Ok(Json(
        state.reservations.resend_confirmation(user_id, id).await?,
    ))
}
