//! Collaborators the booking services call out to.

pub mod notification;

pub use notification::{
    Confirmation, ConfirmationKind, InMemoryNotifier, LogNotifier, NotificationError, Notifier,
};
