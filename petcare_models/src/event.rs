use chrono::{DateTime, Utc};

pub type EventId = i64;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EventStatus {
    Pending,
    Completed,
    Cancelled,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    Vaccine,
    Checkup,
    Grooming,
    Other,
}

/// A care activity on the pet's calendar. Owned by the application; the
/// reminder engine only reads it.
#[derive(Debug, Clone)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub kind: EventKind,
    pub start_time: DateTime<Utc>,
    pub status: EventStatus,
}

impl Event {
    pub fn is_pending(&self) -> bool {
        self.status == EventStatus::Pending
    }
}
