// 🔔 Notifications - user-visible success/error messages
//
// Fire-and-forget: sinks never report back and never fail.

use serde::Serialize;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Notification {
    pub fn success(title: &str, description: &str) -> Self {
        Notification {
            title: title.to_string(),
            description: description.to_string(),
            severity: Severity::Success,
        }
    }

    pub fn error(title: &str, description: &str) -> Self {
        Notification {
            title: title.to_string(),
            description: description.to_string(),
            severity: Severity::Error,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

pub trait NotificationSink {
    fn notify(&mut self, notification: Notification);
}

/// Collects notifications in order. The terminal dialog keeps its message
/// log this way.
impl NotificationSink for Vec<Notification> {
    fn notify(&mut self, notification: Notification) {
        self.push(notification);
    }
}

/// Sends notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&mut self, notification: Notification) {
        match notification.severity {
            Severity::Success => info!(title = %notification.title, "{}", notification.description),
            Severity::Error => error!(title = %notification.title, "{}", notification.description),
        }
    }
}
