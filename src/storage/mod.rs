mod event_storage;
mod model;

pub use event_storage::{EventStore, InMemoryEventStore};
pub use model::{NewEvent, UpdateEvent};
