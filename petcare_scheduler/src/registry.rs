use std::{
    collections::{BTreeMap, HashMap},
    ops::{Deref, DerefMut},
    sync::{Arc, Mutex, PoisonError},
};

use chrono::{DateTime, Utc};
use petcare_models::{event::EventId, reminder::ReminderOffset};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::dispatcher::NotificationHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledReminder {
    pub event_id: EventId,
    pub offset: ReminderOffset,
    pub trigger_at: DateTime<Utc>,
    pub handle: NotificationHandle,
}

/// Live reminders of a single event, at most one per offset.
#[derive(Debug, Default)]
pub struct EventReminders {
    reminders: BTreeMap<ReminderOffset, ScheduledReminder>,
}

impl EventReminders {
    pub fn iter(&self) -> impl Iterator<Item = &ScheduledReminder> {
        self.reminders.values()
    }

    pub fn get(&self, offset: ReminderOffset) -> Option<&ScheduledReminder> {
        self.reminders.get(&offset)
    }

    /// Returns the reminder that previously occupied the same offset, if any.
    pub fn put(&mut self, reminder: ScheduledReminder) -> Option<ScheduledReminder> {
        self.reminders.insert(reminder.offset, reminder)
    }

    pub fn remove(&mut self, offset: ReminderOffset) -> Option<ScheduledReminder> {
        self.reminders.remove(&offset)
    }

    pub fn remove_all(&mut self) -> Vec<ScheduledReminder> {
        std::mem::take(&mut self.reminders).into_values().collect()
    }

    pub fn len(&self) -> usize {
        self.reminders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reminders.is_empty()
    }
}

type EventSlot = Arc<AsyncMutex<EventReminders>>;

/// Outstanding reminder handles keyed by event.
///
/// Every event gets its own async lock, so work on one event is serialized
/// while different events never wait on each other. The outer map lock is
/// only held to look up or drop a slot, never across an await.
#[derive(Debug, Default)]
pub struct ScheduleRegistry {
    slots: Mutex<HashMap<EventId, EventSlot>>,
}

impl ScheduleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclusive access to one event's reminders until the guard drops.
    pub async fn lock(&self, event_id: EventId) -> EventGuard<'_> {
        let slot = {
            let mut slots = self.slots();
            Arc::clone(slots.entry(event_id).or_default())
        };

        EventGuard {
            registry: self,
            event_id,
            guard: Some(slot.lock_owned().await),
        }
    }

    pub async fn get(&self, event_id: EventId) -> Vec<ScheduledReminder> {
        let slot = self.slots().get(&event_id).cloned();
        match slot {
            Some(slot) => slot.lock().await.iter().cloned().collect(),
            None => Vec::new(),
        }
    }

    fn slots(&self) -> std::sync::MutexGuard<'_, HashMap<EventId, EventSlot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drops the slot of an event once nobody holds or waits for it and it
    /// has no reminders left. Slot clones are only handed out under the map
    /// lock, so a strong count of one means the map is the sole owner.
    fn prune(&self, event_id: EventId) {
        let mut slots = self.slots();
        let unused = slots.get(&event_id).is_some_and(|slot| {
            Arc::strong_count(slot) == 1 && slot.try_lock().is_ok_and(|r| r.is_empty())
        });

        if unused {
            slots.remove(&event_id);
        }
    }
}

pub struct EventGuard<'a> {
    registry: &'a ScheduleRegistry,
    event_id: EventId,
    guard: Option<OwnedMutexGuard<EventReminders>>,
}

impl Deref for EventGuard<'_> {
    type Target = EventReminders;

    fn deref(&self) -> &Self::Target {
        self.guard.as_deref().expect("Guard is only taken on drop.")
    }
}

impl DerefMut for EventGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.guard.as_deref_mut().expect("Guard is only taken on drop.")
    }
}

impl Drop for EventGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.registry.prune(self.event_id);
    }
}
