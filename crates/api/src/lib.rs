//! HTTP API server for the booking platform.
//!
//! Exposes the event catalog, reservations, invoices and staff operations
//! as JSON endpoints, with structured logging (tracing) and Prometheus
//! metrics. Callers are identified by headers set by the gateway, see
//! [`extract`].

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use booking::{BillingService, BookingPolicy, EventCatalog, Notifier, ReservationService};
use metrics_exporter_prometheus::PrometheusHandle;
use store::BookingStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::{Config, LogFormat};

/// Shared application state accessible from all handlers.
pub struct AppState<S, N> {
    pub catalog: EventCatalog<S>,
    pub reservations: ReservationService<S, N>,
}

impl<S, N> AppState<S, N>
where
    S: BookingStore + Clone,
    N: Notifier,
{
    pub fn new(store: S, notifier: N, policy: BookingPolicy) -> Self {
        Self {
            catalog: EventCatalog::new(store.clone()),
            reservations: ReservationService::new(store, notifier, policy),
        }
    }

    pub fn billing(&self) -> &BillingService<S> {
        self.reservations.billing()
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, N>(state: Arc<AppState<S, N>>, metrics_handle: PrometheusHandle) -> Router
where
    S: BookingStore + Clone + 'static,
    N: Notifier + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::observability::metrics))
        .with_state(metrics_handle);

    let admin = Router::new()
        .route("/events", post(routes::admin::create_event::<S, N>))
        .route(
            "/events/{id}",
            axum::routing::put(routes::admin::update_event::<S, N>),
        )
        .route(
            "/events/{id}/status",
            post(routes::admin::change_status::<S, N>),
        )
        .route(
            "/reservations/by-code/{code}",
            get(routes::admin::find_reservation::<S, N>),
        )
        .route(
            "/invoices/{id}/discount",
            post(routes::admin::discount_invoice::<S, N>),
        )
        .route(
            "/payments/{id}/complete",
            post(routes::admin::complete_payment::<S, N>),
        )
        .route(
            "/payments/{id}/fail",
            post(routes::admin::fail_payment::<S, N>),
        )
        .route(
            "/payments/{id}/refund",
            post(routes::admin::refund_payment::<S, N>),
        );

    Router::new()
        .route("/health", get(routes::observability::health::<S, N>))
        .route("/events", get(routes::events::list::<S, N>))
        .route("/events/{id}", get(routes::events::get::<S, N>))
        .route(
            "/events/{id}/reservations",
            post(routes::reservations::create::<S, N>),
        )
        .route("/reservations", get(routes::reservations::list::<S, N>))
        .route(
            "/reservations/{id}",
            get(routes::reservations::get::<S, N>).put(routes::reservations::update::<S, N>),
        )
        .route(
            "/reservations/{id}/cancel",
            post(routes::reservations::cancel::<S, N>),
        )
        .route(
            "/reservations/{id}/resend-confirmation",
            post(routes::reservations::resend_confirmation::<S, N>),
        )
        .route("/invoices/{id}", get(routes::invoices::get::<S, N>))
        .route(
            "/invoices/{id}/payments",
            post(routes::invoices::pay::<S, N>),
        )
        .nest("/admin", admin)
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
