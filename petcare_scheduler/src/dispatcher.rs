use std::{
    collections::{HashMap, HashSet},
    fmt,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use petcare_models::{event::EventId, reminder::ReminderOffset};

const PAYLOAD_EVENT_ID: &str = "event_id";
const PAYLOAD_OFFSET: &str = "offset";

/// Opaque id handed out by a dispatcher for one scheduled notification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotificationHandle(String);

impl NotificationHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for NotificationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub type NotificationPayload = HashMap<String, String>;

#[derive(Debug, Clone)]
pub struct NotificationRequest {
    pub title: String,
    pub body: String,
    pub trigger_at: DateTime<Utc>,
    pub payload: NotificationPayload,
}

/// Platform side of reminder delivery: push service, OS scheduler, e-mail...
#[async_trait]
pub trait NotificationDispatcher: Send + Sync + 'static {
    async fn schedule(&self, request: NotificationRequest) -> anyhow::Result<NotificationHandle>;

    async fn cancel(&self, handle: &NotificationHandle) -> anyhow::Result<()>;

    /// Handles the platform still considers pending. Audit only.
    async fn list_scheduled(&self) -> anyhow::Result<HashSet<NotificationHandle>>;
}

/// What the engine attaches to each notification so a fired one can be
/// traced back to its `(event, offset)` pair.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ReminderPayload {
    pub event_id: EventId,
    pub offset: ReminderOffset,
}

impl ReminderPayload {
    pub fn into_payload(self) -> NotificationPayload {
        HashMap::from([
            (PAYLOAD_EVENT_ID.to_owned(), self.event_id.to_string()),
            (PAYLOAD_OFFSET.to_owned(), self.offset.to_string()),
        ])
    }

    pub fn from_payload(payload: &NotificationPayload) -> Option<Self> {
        let event_id = payload.get(PAYLOAD_EVENT_ID)?.parse().ok()?;
        let offset = payload.get(PAYLOAD_OFFSET)?.parse().ok()?;

        Some(Self { event_id, offset })
    }
}
