//! Staff operations on events, reservations, invoices and payments.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use booking::{InvoiceDetails, Notifier, PaymentReceipt, ReservationDetails};
use common::{EventId, InvoiceId, PaymentId};
use domain::{Event, EventStatus, EventUpdate, Money, NewEvent, Payment};
use serde::Deserialize;
use store::BookingStore;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::Staff;
use crate::routes::parse_id;

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: EventStatus,
}

/// Body of `POST /admin/invoices/{id}/discount`. `amount` is in cents.
#[derive(Debug, Deserialize)]
pub struct DiscountRequest {
    pub amount: Money,
}

/// POST /admin/events
#[tracing::instrument(skip(state, input), fields(title = %input.title))]
pub async fn create_event<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    _staff: Staff,
    Json(input): Json<NewEvent>,
) -> Result<(StatusCode, Json<Event>), ApiError>
where
    S: BookingStore + Clone + 'static,
    N: Notifier + 'static,
{
    let event = state.catalog.create_event(input).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// PUT /admin/events/{id}
#[tracing::instrument(skip(state, update))]
pub async fn update_event<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Path(id): Path<String>,
    _staff: Staff,
    Json(update): Json<EventUpdate>,
) -> Result<Json<Event>, ApiError>
where
    S: BookingStore + Clone + 'static,
    N: Notifier + 'static,
{
    let id: EventId = parse_id("event", &id)?;
    Ok(Json(state.catalog.update_event(id, update).await?))
}

/// POST /admin/events/{id}/status
#[tracing::instrument(skip(state))]
pub async fn change_status<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Path(id): Path<String>,
    _staff: Staff,
    Json(change): Json<StatusChange>,
) -> Result<Json<Event>, ApiError>
where
    S: BookingStore + Clone + 'static,
    N: Notifier + 'static,
{
    let id: EventId = parse_id("event", &id)?;
    Ok(Json(state.catalog.change_status(id, change.status).await?))
}

/// GET /admin/reservations/by-code/{code}
#[tracing::instrument(skip(state))]
pub async fn find_reservation<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Path(code): Path<String>,
    _staff: Staff,
) -> Result<Json<ReservationDetails>, ApiError>
where
    S: BookingStore + Clone + 'static,
    N: Notifier + 'static,
{
    state
        .reservations
        .find_by_code(&code)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("reservation {code} not found")))
}

/// POST /admin/invoices/{id}/discount
#[tracing::instrument(skip(state, request))]
pub async fn discount_invoice<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Path(id): Path<String>,
    _staff: Staff,
    Json(request): Json<DiscountRequest>,
) -> Result<Json<InvoiceDetails>, ApiError>
where
    S: BookingStore + Clone + 'static,
    N: Notifier + 'static,
{
    let id: InvoiceId = parse_id("invoice", &id)?;
    Ok(Json(
        state.billing().apply_discount(id, request.amount).await?,
    ))
}

/// POST /admin/payments/{id}/complete
#[tracing::instrument(skip(state))]
pub async fn complete_payment<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Path(id): Path<String>,
    _staff: Staff,
) -> Result<Json<PaymentReceipt>, ApiError>
where
    S: BookingStore + Clone + 'static,
    N: Notifier + 'static,
{
    let id: PaymentId = parse_id("payment", &id)?;
    Ok(Json(state.billing().complete_payment(id).await?))
}

/// POST /admin/payments/{id}/fail
#[tracing::instrument(skip(state))]
pub async fn fail_payment<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Path(id): Path<String>,
    _staff: Staff,
) -> Result<Json<Payment>, ApiError>
where
    S: BookingStore + Clone + 'static,
    N: Notifier + 'static,
{
    let id: PaymentId = parse_id("payment", &id)?;
    Ok(Json(state.billing().fail_payment(id).await?))
}

/// POST /admin/payments/{id}/refund
#[tracing::instrument(skip(state))]
pub async fn refund_payment<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Path(id): Path<String>,
    _staff: Staff,
) -> Result<Json<Payment>, ApiError>
where
    S: BookingStore + Clone + 'static,
    N: Notifier + 'static,
{
    let id: PaymentId = parse_id("payment", &id)?;
    Ok(Json(state.billing().refund_payment(id).await?))
}
