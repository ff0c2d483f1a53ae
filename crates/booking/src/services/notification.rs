//! Notifier trait with logging and in-memory implementations.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::UserId;
use domain::Money;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::ticket::Ticket;

/// Delivery of a confirmation failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Notification delivery failed: {0}")]
pub struct NotificationError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationKind {
    /// Sent right after booking.
    Booked,
    /// Sent again on request.
    Resent,
}

/// Booking confirmation carrying the ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Confirmation {
    pub kind: ConfirmationKind,
    pub user_id: UserId,
    pub total_price: Money,
    pub ticket: Ticket,
}

/// Sends confirmations to users.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_confirmation(&self, confirmation: &Confirmation)
    -> Result<(), NotificationError>;
}

#[async_trait]
impl<T: Notifier + ?Sized> Notifier for Arc<T> {
    async fn send_confirmation(
        &self,
        confirmation: &Confirmation,
    ) -> Result<(), NotificationError> {
        (**self).send_confirmation(confirmation).await
    }
}

/// Writes confirmations to the log instead of delivering them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_confirmation(
        &self,
        confirmation: &Confirmation,
    ) -> Result<(), NotificationError> {
        tracing::info!(
            user_id = %confirmation.user_id,
            reservation_code = %confirmation.ticket.reservation_code,
            kind = ?confirmation.kind,
            payload = %confirmation.ticket.payload,
            "confirmation sent"
        );
        Ok(())
    }
}

/// In-memory notifier for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotifier {
    sent: Arc<RwLock<Vec<Confirmation>>>,
    fail: Arc<AtomicBool>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every delivery fail until reset.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Confirmations delivered so far, oldest first.
    pub async fn sent(&self) -> Vec<Confirmation> {
        self.sent.read().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.read().await.len()
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn send_confirmation(
        &self,
        confirmation: &Confirmation,
    ) -> Result<(), NotificationError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotificationError("mail server unavailable".to_string()));
        }
        self.sent.write().await.push(confirmation.clone());
        Ok(())
    }
}
