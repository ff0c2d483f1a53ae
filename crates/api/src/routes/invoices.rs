//! Invoice lookup and client payments.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use booking::{InvoiceDetails, Notifier, PaymentReceipt, PaymentRequest};
use common::InvoiceId;
use store::BookingStore;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::Requester;
use crate::routes::parse_id;

/// GET /invoices/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Path(id): Path<String>,
    Requester(user_id): Requester,
) -> Result<Json<InvoiceDetails>, ApiError>
where
    S: BookingStore + Clone + 'static,
    N: Notifier + 'static,
{
    let id: InvoiceId = parse_id("invoice", &id)?;
    Ok(Json(state.billing().get_invoice(user_id, id).await?))
}

/// POST /invoices/{id}/payments
///
/// Omitting `amount` pays the outstanding balance.
#[tracing::instrument(skip(state, request))]
pub async fn pay<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Path(id): Path<String>,
    Requester(user_id): Requester,
    Json(request): Json<PaymentRequest>,
) -> Result<(StatusCode, Json<PaymentReceipt>), ApiError>
where
    S: BookingStore + Clone + 'static,
    N: Notifier + 'static,
{
    let id: InvoiceId = parse_id("invoice", &id)?;
    let receipt = state.billing().pay_invoice(user_id, id, request).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}
