//! Broadcast channel for outbound notices.
//!
//! [`NotificationBus`] wraps a [`tokio::sync::broadcast`] channel. Services
//! publish a [`Notice`] after each committed financial unit; the chat
//! transport subscribes and delivers. Delivery is best-effort: a notice that
//! cannot be queued is logged and dropped, and never rolls back or retries
//! the financial effect it reports.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::domain::ExternalId;

/// One outbound message for the chat transport to deliver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    /// Platform reference of the receiving account.
    pub to: ExternalId,
    /// Message body, already rendered.
    pub text: String,
    /// When the notice was queued.
    pub queued_at: DateTime<Utc>,
}

/// Error produced when a notice cannot be handed to any transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum NotifyError {
    /// No live transport subscriber; the notice was dropped.
    #[error("no delivery transport attached")]
    NoTransport,
}

/// Broadcast bus for [`Notice`]s.
///
/// Backed by a `tokio::broadcast` channel with a configurable capacity.
/// When the ring buffer is full, lagging receivers lose the oldest notices
/// first.
#[derive(Debug, Clone)]
pub struct NotificationBus {
    sender: broadcast::Sender<Notice>,
}

impl NotificationBus {
    /// Creates a new `NotificationBus` with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Queues a notice for delivery.
    ///
    /// Returns the number of transports that picked it up.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::NoTransport`] when no subscriber is attached;
    /// the notice is dropped in that case.
    pub fn send(&self, to: ExternalId, text: impl Into<String>) -> Result<usize, NotifyError> {
        let notice = Notice {
            to,
            text: text.into(),
            queued_at: Utc::now(),
        };
        self.sender.send(notice).map_err(|_| NotifyError::NoTransport)
    }

    /// Queues a notice, logging instead of failing when delivery is not
    /// possible. This is the form services use after a commit.
    pub fn notify(&self, to: &ExternalId, text: impl Into<String>) {
        if let Err(err) = self.send(to.clone(), text) {
            tracing::warn!(account = %to, error = %err, "notice dropped");
        }
    }

    /// Creates a new receiver for all future notices.
    ///
    /// The chat transport calls this once on startup; tests use it to
    /// observe delivery.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.sender.subscribe()
    }

    /// Returns the current number of attached transports.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn send_without_transport_reports_error() {
        let bus = NotificationBus::new(16);
        let result = bus.send(ExternalId::new("1001"), "hello");
        assert_eq!(result, Err(NotifyError::NoTransport));
    }

    #[test]
    fn notify_swallows_missing_transport() {
        let bus = NotificationBus::new(16);
        // Must not error or panic with nobody listening.
        bus.notify(&ExternalId::new("1001"), "hello");
    }

    #[tokio::test]
    async fn transport_receives_notice() {
        let bus = NotificationBus::new(16);
        let mut rx = bus.subscribe();

        let result = bus.send(ExternalId::new("1001"), "balance credited");
        assert_eq!(result.ok(), Some(1));

        let notice = rx.recv().await;
        let Ok(notice) = notice else {
            panic!("expected to receive notice");
        };
        assert_eq!(notice.to, ExternalId::new("1001"));
        assert_eq!(notice.text, "balance credited");
    }

    #[tokio::test]
    async fn multiple_transports_receive_same_notice() {
        let bus = NotificationBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let result = bus.send(ExternalId::new("42"), "hi");
        assert_eq!(result.ok(), Some(2));

        let n1 = rx1.recv().await;
        let n2 = rx2.recv().await;
        let (Ok(n1), Ok(n2)) = (n1, n2) else {
            panic!("both transports should receive");
        };
        assert_eq!(n1, n2);
    }

    #[test]
    fn receiver_count_tracks_transports() {
        let bus = NotificationBus::new(16);
        assert_eq!(bus.receiver_count(), 0);
        let rx = bus.subscribe();
        assert_eq!(bus.receiver_count(), 1);
        drop(rx);
        assert_eq!(bus.receiver_count(), 0);
    }
}
