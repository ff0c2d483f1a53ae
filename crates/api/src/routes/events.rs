//! Public event catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use booking::{EventDetails, Notifier};
use chrono::Utc;
use common::EventId;
use domain::{Category, EventStatus};
use serde::Deserialize;
use store::{BookingStore, EventQuery};

use crate::AppState;
use crate::error::ApiError;
use crate::routes::parse_id;

/// Query string of `GET /events`.
#[derive(Debug, Default, Deserialize)]
pub struct EventListParams {
    pub status: Option<EventStatus>,
    pub category: Option<Category>,
    /// Only confirmed events that have not started.
    #[serde(default)]
    pub upcoming: bool,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl EventListParams {
    fn into_query(self) -> EventQuery {
        let mut query = if self.upcoming {
            EventQuery::upcoming(Utc::now())
        } else {
            EventQuery::new()
        };
        // Upcoming listings are confirmed events only.
        if let Some(status) = self.status.filter(|_| !self.upcoming) {
            query = query.status(status);
        }
        if let Some(category) = self.category {
            query = query.category(category);
        }
        if let Some(limit) = self.limit {
            query = query.limit(limit);
        }
        if let Some(offset) = self.offset {
            query = query.offset(offset);
        }
        query
    }
}

/// GET /events
#[tracing::instrument(skip(state))]
pub async fn list<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Query(params): Query<EventListParams>,
) -> Result<Json<Vec<EventDetails>>, ApiError>
where
    S: BookingStore + Clone + 'static,
    N: Notifier + 'static,
{
    let events = state.catalog.list_events(params.into_query()).await?;
    Ok(Json(events))
}

/// GET /events/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Path(id): Path<String>,
) -> Result<Json<EventDetails>, ApiError>
where
    S: BookingStore + Clone + 'static,
    N: Notifier + 'static,
{
    let id: EventId = parse_id("event", &id)?;
    Ok(Json(state.catalog.get_event(id).await?))
}
