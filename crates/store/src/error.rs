use common::{EventId, Version};
use domain::UnknownVariant;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur when reading or writing booking records.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The record changed since it was read.
    #[error("Concurrency conflict for {entity} {id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        entity: &'static str,
        id: Uuid,
        expected: Version,
        actual: Version,
    },

    /// No record with this id exists.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    /// The conditional seat decrement matched no row.
    #[error(
        "Insufficient seats for event {event_id}: requested {requested}, available {available}"
    )]
    InsufficientSeats {
        event_id: EventId,
        requested: u32,
        available: u32,
    },

    /// A unique key is already taken.
    #[error("Duplicate {entity}: {key}")]
    Duplicate { entity: &'static str, key: String },

    /// A stored value could not be mapped back onto a domain type.
    #[error("Invalid stored value: {0}")]
    InvalidData(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Failure injected by the in-memory store.
    #[error("Injected failure: {0}")]
    Injected(&'static str),
}

impl From<UnknownVariant> for StoreError {
    fn from(err: UnknownVariant) -> Self {
        StoreError::InvalidData(err.to_string())
    }
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, id: impl Into<Uuid>) -> Self {
        StoreError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
