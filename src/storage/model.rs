use chrono::{DateTime, Utc};
use petcare_models::event::{EventId, EventKind, EventStatus};

pub struct NewEvent {
    pub title: String,
    pub kind: EventKind,
    pub start_time: DateTime<Utc>,
}

pub struct UpdateEvent {
    pub id: EventId,
    pub title: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub status: Option<EventStatus>,
}
