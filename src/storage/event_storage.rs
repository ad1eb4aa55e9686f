use std::collections::BTreeMap;

use async_trait::async_trait;
use petcare_models::event::{Event, EventId, EventStatus};
use tokio::sync::RwLock;

use super::model::{NewEvent, UpdateEvent};

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn insert(&self, event: NewEvent) -> anyhow::Result<Event>;
    async fn update(&self, event: UpdateEvent) -> anyhow::Result<Event>;
    async fn delete(&self, id: EventId) -> anyhow::Result<Option<Event>>;
    async fn get(&self, id: EventId) -> anyhow::Result<Option<Event>>;
    async fn get_all(&self) -> anyhow::Result<Vec<Event>>;
}

#[derive(Default)]
struct InMemoryStore {
    next_id: EventId,
    events: BTreeMap<EventId, Event>,
}

#[derive(Default)]
pub struct InMemoryEventStore {
    store: RwLock<InMemoryStore>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn insert(&self, event: NewEvent) -> anyhow::Result<Event> {
        let mut store = self.store.write().await;
        store.next_id += 1;
        let event = Event {
            id: store.next_id,
            title: event.title,
            kind: event.kind,
            start_time: event.start_time,
            status: EventStatus::Pending,
        };

        store.events.insert(event.id, event.clone());
        log::info!("Stored event. [event_id = {}]", event.id);
        Ok(event)
    }

    async fn update(&self, update: UpdateEvent) -> anyhow::Result<Event> {
        let mut store = self.store.write().await;
        let Some(event) = store.events.get_mut(&update.id) else {
            anyhow::bail!("Event {} does not exist", update.id);
        };

        if let Some(title) = update.title {
            event.title = title;
        }
        if let Some(start_time) = update.start_time {
            event.start_time = start_time;
        }
        if let Some(status) = update.status {
            event.status = status;
        }

        Ok(event.clone())
    }

    async fn delete(&self, id: EventId) -> anyhow::Result<Option<Event>> {
        Ok(self.store.write().await.events.remove(&id))
    }

    async fn get(&self, id: EventId) -> anyhow::Result<Option<Event>> {
        Ok(self.store.read().await.events.get(&id).cloned())
    }

    async fn get_all(&self) -> anyhow::Result<Vec<Event>> {
        Ok(self.store.read().await.events.values().cloned().collect())
    }
}
