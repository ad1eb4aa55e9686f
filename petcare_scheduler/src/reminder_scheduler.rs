use std::sync::Arc;

use petcare_models::{
    event::{Event, EventId},
    reminder::ReminderOffset,
};
use tokio::task::{self, JoinError, JoinHandle};

use crate::{
    clock::Clock,
    dispatcher::{NotificationDispatcher, NotificationHandle, NotificationRequest, ReminderPayload},
    message::{reminder_body, reminder_title},
    policy,
    registry::{EventReminders, ScheduleRegistry, ScheduledReminder},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchFailure {
    pub offset: ReminderOffset,
    pub reason: String,
}

/// Per-offset outcome of a schedule or reconcile call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleReport {
    pub scheduled: Vec<ReminderOffset>,
    /// Trigger time is not in the future. Not a failure.
    pub skipped_past: Vec<ReminderOffset>,
    /// The event is completed or cancelled. Not a failure.
    pub skipped_inactive: Vec<ReminderOffset>,
    pub failed: Vec<DispatchFailure>,
}

impl ScheduleReport {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn failed_offsets(&self) -> Vec<ReminderOffset> {
        self.failed.iter().map(|f| f.offset).collect()
    }
}

/// Keeps the dispatcher and the registry in step for every event.
///
/// Each operation runs on its own task. A caller that stops waiting, for
/// example on a timeout, does not interrupt it, so every handle the
/// dispatcher returns is either registered or cancelled.
pub struct ReminderScheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    dispatcher: Arc<dyn NotificationDispatcher>,
    clock: Arc<dyn Clock>,
    registry: ScheduleRegistry,
}

impl ReminderScheduler {
    pub fn new(dispatcher: Arc<dyn NotificationDispatcher>, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                dispatcher,
                clock,
                registry: ScheduleRegistry::new(),
            }),
        }
    }

    pub async fn schedule_for_new_event(
        &self,
        event: &Event,
        offsets: &[ReminderOffset],
    ) -> ScheduleReport {
        let (event, offsets) = (event.clone(), offsets.to_vec());
        let work = {
            let offsets = offsets.clone();
            self.detached(move |inner| async move {
                inner.schedule_for_new_event(&event, &offsets).await
            })
        };

        work.await
            .unwrap_or_else(|join_error| interrupted_report(&offsets, join_error))
    }

    /// Cancels every outstanding reminder of the event, then schedules a fresh
    /// set against its current start time. The cancels finish before any new
    /// schedule call is made.
    pub async fn reconcile_for_updated_event(
        &self,
        event: &Event,
        offsets: &[ReminderOffset],
    ) -> ScheduleReport {
        let (event, offsets) = (event.clone(), offsets.to_vec());
        let work = {
            let offsets = offsets.clone();
            self.detached(move |inner| async move {
                inner.reconcile_for_updated_event(&event, &offsets).await
            })
        };

        work.await
            .unwrap_or_else(|join_error| interrupted_report(&offsets, join_error))
    }

    pub async fn cancel_for_deleted_event(&self, event_id: EventId) {
        let work = self.detached(move |inner| async move {
            inner.cancel_for_deleted_event(event_id).await
        });

        if let Err(join_error) = work.await {
            log::error!("Cancel task failed. [event_id = {event_id}, error = {join_error}]");
        }
    }

    /// Dismisses a single reminder, cancelling it with the dispatcher.
    pub async fn cancel_one(&self, event_id: EventId, offset: ReminderOffset) {
        let work = self.detached(move |inner| async move {
            inner.cancel_one(event_id, offset).await
        });

        if let Err(join_error) = work.await {
            log::error!(
                "Cancel task failed. [event_id = {event_id}, offset = {offset}, error = {join_error}]"
            );
        }
    }

    /// Forgets a reminder the dispatcher has already delivered.
    ///
    /// Only the entry registered under `handle` is removed. A delivery report
    /// for a notification that was since replaced leaves the newer reminder
    /// in place.
    pub async fn mark_fired(
        &self,
        event_id: EventId,
        offset: ReminderOffset,
        handle: &NotificationHandle,
    ) -> Option<ScheduledReminder> {
        let mut reminders = self.inner.registry.lock(event_id).await;
        let live_handle = reminders.get(offset).map(|r| r.handle.clone());

        match live_handle {
            Some(live) if &live == handle => reminders.remove(offset),
            Some(live) => {
                log::debug!(
                    "Fired notification was already replaced. [event_id = {event_id}, offset = {offset}, handle = {handle}, live_handle = {live}]"
                );
                None
            }
            None => {
                log::debug!(
                    "Fired reminder was not registered. [event_id = {event_id}, offset = {offset}, handle = {handle}]"
                );
                None
            }
        }
    }

    pub async fn scheduled(&self, event_id: EventId) -> Vec<ScheduledReminder> {
        self.inner.registry.get(event_id).await
    }

    fn detached<F, Fut, T>(&self, work: F) -> JoinHandle<T>
    where
        F: FnOnce(Arc<SchedulerInner>) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        task::spawn(work(Arc::clone(&self.inner)))
    }
}

fn interrupted_report(offsets: &[ReminderOffset], join_error: JoinError) -> ScheduleReport {
    log::error!("Scheduler task failed. [error = {join_error}]");
    ScheduleReport {
        failed: policy::distinct(offsets)
            .into_iter()
            .map(|offset| DispatchFailure {
                offset,
                reason: format!("scheduler task failed: {join_error}"),
            })
            .collect(),
        ..Default::default()
    }
}

impl SchedulerInner {
    async fn schedule_for_new_event(
        &self,
        event: &Event,
        offsets: &[ReminderOffset],
    ) -> ScheduleReport {
        let mut reminders = self.registry.lock(event.id).await;
        if !reminders.is_empty() {
            log::warn!(
                "Event already has live reminders, replacing them. [event_id = {}, count = {}]",
                event.id,
                reminders.len()
            );
            self.cancel_all(&mut reminders).await;
        }

        self.dispatch(event, offsets, &mut reminders).await
    }

    async fn reconcile_for_updated_event(
        &self,
        event: &Event,
        offsets: &[ReminderOffset],
    ) -> ScheduleReport {
        let mut reminders = self.registry.lock(event.id).await;
        self.cancel_all(&mut reminders).await;

        self.dispatch(event, offsets, &mut reminders).await
    }

    async fn cancel_for_deleted_event(&self, event_id: EventId) {
        let mut reminders = self.registry.lock(event_id).await;
        if reminders.is_empty() {
            log::debug!("No reminders to cancel for deleted event. [event_id = {event_id}]");
            return;
        }

        self.cancel_all(&mut reminders).await;
    }

    async fn cancel_one(&self, event_id: EventId, offset: ReminderOffset) {
        let removed = self.registry.lock(event_id).await.remove(offset);
        match removed {
            Some(reminder) => self.cancel_reminder(reminder).await,
            None => log::debug!(
                "Cancel requested for a reminder that is not registered. [event_id = {event_id}, offset = {offset}]"
            ),
        }
    }

    async fn dispatch(
        &self,
        event: &Event,
        offsets: &[ReminderOffset],
        reminders: &mut EventReminders,
    ) -> ScheduleReport {
        if !event.is_pending() {
            log::info!(
                "Event is not pending, no reminders scheduled. [event_id = {}, status = {:?}]",
                event.id,
                event.status
            );
            return ScheduleReport {
                skipped_inactive: policy::distinct(offsets),
                ..Default::default()
            };
        }

        let plan = policy::plan(event.start_time, offsets, self.clock.now());
        let mut report = ScheduleReport {
            skipped_past: plan.skipped_past,
            ..Default::default()
        };

        let title = reminder_title(event);
        let calls: Vec<_> = plan
            .due
            .into_iter()
            .map(|planned| {
                let request = NotificationRequest {
                    title: title.clone(),
                    body: reminder_body(planned.offset),
                    trigger_at: planned.trigger_at,
                    payload: ReminderPayload {
                        event_id: event.id,
                        offset: planned.offset,
                    }
                    .into_payload(),
                };
                let dispatcher = Arc::clone(&self.dispatcher);
                let call = task::spawn(async move { dispatcher.schedule(request).await });

                (planned, call)
            })
            .collect();

        for (planned, call) in calls {
            let offset = planned.offset;
            let outcome = match call.await {
                Ok(outcome) => outcome,
                Err(join_error) => {
                    log::error!(
                        "Dispatcher task failed. [event_id = {}, offset = {offset}, error = {join_error}]",
                        event.id
                    );
                    Err(anyhow::anyhow!("dispatcher task failed: {join_error}"))
                }
            };

            match outcome {
                Ok(handle) => {
                    log::info!(
                        "Scheduled reminder. [event_id = {}, offset = {offset}, trigger_at = {}, handle = {handle}]",
                        event.id,
                        planned.trigger_at
                    );
                    let replaced = reminders.put(ScheduledReminder {
                        event_id: event.id,
                        offset,
                        trigger_at: planned.trigger_at,
                        handle,
                    });
                    if let Some(replaced) = replaced {
                        log::warn!(
                            "Replaced a registered reminder, cancelling its notification. [event_id = {}, offset = {offset}, handle = {}]",
                            event.id,
                            replaced.handle
                        );
                        self.cancel_reminder(replaced).await;
                    }
                    report.scheduled.push(offset);
                }
                Err(error) => {
                    log::warn!(
                        "Could not schedule reminder. [event_id = {}, offset = {offset}, error = {error:#}]",
                        event.id
                    );
                    report.failed.push(DispatchFailure {
                        offset,
                        reason: format!("{error:#}"),
                    });
                }
            }
        }

        report
    }

    /// Best effort: failures are logged and the entries are dropped anyway.
    async fn cancel_all(&self, reminders: &mut EventReminders) {
        let calls: Vec<_> = reminders
            .remove_all()
            .into_iter()
            .map(|reminder| {
                let dispatcher = Arc::clone(&self.dispatcher);
                task::spawn(async move {
                    let outcome = dispatcher.cancel(&reminder.handle).await;
                    (reminder, outcome)
                })
            })
            .collect();

        for call in calls {
            match call.await {
                Ok((reminder, outcome)) => log_cancel_outcome(&reminder, outcome),
                Err(join_error) => {
                    log::error!("Dispatcher cancel task failed. [error = {join_error}]")
                }
            }
        }
    }

    async fn cancel_reminder(&self, reminder: ScheduledReminder) {
        let outcome = self.dispatcher.cancel(&reminder.handle).await;
        log_cancel_outcome(&reminder, outcome);
    }
}

fn log_cancel_outcome(reminder: &ScheduledReminder, outcome: anyhow::Result<()>) {
    match outcome {
        Ok(()) => log::info!(
            "Cancelled reminder. [event_id = {}, offset = {}, handle = {}]",
            reminder.event_id,
            reminder.offset,
            reminder.handle
        ),
        Err(error) => log::warn!(
            "Could not cancel reminder, it may still fire. [event_id = {}, offset = {}, handle = {}, error = {error:#}]",
            reminder.event_id,
            reminder.offset,
            reminder.handle
        ),
    }
}
