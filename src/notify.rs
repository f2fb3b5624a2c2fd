//! User-facing notifications
//!
//! Tools report outcomes through an injected [`Notifier`]. The MCP session
//! owns a bounded [`NotificationQueue`] that clients poll with
//! `get_notifications`.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::Utc;
use serde::Serialize;

use crate::error::AppError;

/// Pending notifications kept per session before the oldest are dropped
pub const QUEUE_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub level: Level,
    pub title: String,
    pub message: String,
    /// Form field an error belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub created_at: String,
}

impl Notification {
    pub fn new(level: Level, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            message: message.into(),
            field: None,
            created_at: Utc::now().to_rfc3339(),
        }
    }

    pub fn from_error(err: &AppError) -> Self {
        Self {
            field: err.field.clone(),
            ..Self::new(Level::Error, err.kind.code(), err.message.clone())
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);

    fn success(&self, message: &str) {
        self.notify(Notification::new(Level::Success, "Success", message));
    }

    fn info(&self, message: &str) {
        self.notify(Notification::new(Level::Info, "Info", message));
    }

    fn error(&self, err: &AppError) {
        self.notify(Notification::from_error(err));
    }
}

/// Bounded FIFO of notifications for one session
#[derive(Debug, Default)]
pub struct NotificationQueue {
    pending: Mutex<VecDeque<Notification>>,
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take everything pending, oldest first
    pub fn drain(&self) -> Vec<Notification> {
        match self.pending.lock() {
            Ok(mut pending) => pending.drain(..).collect(),
            Err(poisoned) => poisoned.into_inner().drain(..).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Notifier for NotificationQueue {
    fn notify(&self, notification: Notification) {
        tracing::debug!(level = ?notification.level, message = %notification.message, "notification");
        let mut pending = match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if pending.len() == QUEUE_CAPACITY {
            pending.pop_front();
        }
        pending.push_back(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_drain_returns_in_order_and_clears() {
        let queue = NotificationQueue::new();
        queue.success("Ingredient created");
        queue.info("Nothing to update");

        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].level, Level::Success);
        assert_eq!(drained[0].message, "Ingredient created");
        assert_eq!(drained[1].level, Level::Info);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let queue = NotificationQueue::new();
        for i in 0..QUEUE_CAPACITY + 5 {
            queue.info(&format!("n{}", i));
        }
        let drained = queue.drain();
        assert_eq!(drained.len(), QUEUE_CAPACITY);
        assert_eq!(drained[0].message, "n5");
    }

    #[test]
    fn test_error_carries_field() {
        let queue = NotificationQueue::new();
        let err = AppError::new(ErrorKind::UniqueViolation, "Name already exists").with_field("name");
        queue.error(&err);

        let drained = queue.drain();
        assert_eq!(drained[0].level, Level::Error);
        assert_eq!(drained[0].title, "unique_violation");
        assert_eq!(drained[0].field.as_deref(), Some("name"));
    }
}
