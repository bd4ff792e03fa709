//! Business logic services for the admin console.

pub mod newsletter;
pub mod notifications;

pub use newsletter::{BroadcastReport, Issue, spawn_broadcast};
pub use notifications::{NotificationError, StatusNotifier};
