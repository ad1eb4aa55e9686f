use std::{collections::BTreeMap, sync::Arc};

use chrono::NaiveDate;
use chrono_tz::Tz;
use petcare_calendar::{
    grid::{self, MonthGrid},
    validity::{self, CarnetDraft, ValidatedDates, ValidationError},
};
use petcare_models::{
    carnet::CarnetEntry,
    event::{Event, EventId},
    reminder::ReminderOffset,
};
use petcare_scheduler::{
    Clock, NotificationDispatcher, NotificationHandle, NotificationPayload, ReminderPayload,
    ReminderScheduler, ScheduleReport, ScheduledReminder,
};

use crate::storage::EventStore;

/// Entry point for the calendar and carnet screens.
pub struct CareEngine {
    scheduler: ReminderScheduler,
    clock: Arc<dyn Clock>,
    timezone: Tz,
}

impl CareEngine {
    pub fn new(
        dispatcher: Arc<dyn NotificationDispatcher>,
        clock: Arc<dyn Clock>,
        timezone: Tz,
    ) -> Self {
        Self {
            scheduler: ReminderScheduler::new(dispatcher, Arc::clone(&clock)),
            clock,
            timezone,
        }
    }

    pub async fn on_event_created(
        &self,
        event: &Event,
        offsets: &[ReminderOffset],
    ) -> ScheduleReport {
        self.scheduler.schedule_for_new_event(event, offsets).await
    }

    pub async fn on_event_updated(
        &self,
        event: &Event,
        offsets: &[ReminderOffset],
    ) -> ScheduleReport {
        self.scheduler
            .reconcile_for_updated_event(event, offsets)
            .await
    }

    pub async fn on_event_deleted(&self, event_id: EventId) {
        self.scheduler.cancel_for_deleted_event(event_id).await
    }

    /// Called with the handle and payload of a notification the platform
    /// delivered.
    pub async fn on_reminder_fired(
        &self,
        handle: &NotificationHandle,
        payload: &NotificationPayload,
    ) -> Option<ScheduledReminder> {
        let Some(reminder) = ReminderPayload::from_payload(payload) else {
            log::warn!(
                "Fired notification does not carry a reminder payload. [handle = {handle}, payload = {payload:?}]"
            );
            return None;
        };

        self.scheduler
            .mark_fired(reminder.event_id, reminder.offset, handle)
            .await
    }

    /// Rebuilds reminders for every stored event, e.g. after a restart.
    pub async fn restore(
        &self,
        store: &dyn EventStore,
        offsets: &[ReminderOffset],
    ) -> anyhow::Result<Vec<(EventId, ScheduleReport)>> {
        let events = store.get_all().await?;
        log::info!("Restoring reminders. [events = {}]", events.len());

        let mut reports = Vec::with_capacity(events.len());
        for event in events {
            let report = self.on_event_updated(&event, offsets).await;
            reports.push((event.id, report));
        }

        Ok(reports)
    }

    pub async fn scheduled_reminders(&self, event_id: EventId) -> Vec<ScheduledReminder> {
        self.scheduler.scheduled(event_id).await
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.now().with_timezone(&self.timezone).date_naive()
    }

    pub fn get_month_grid(&self, reference: NaiveDate) -> Option<MonthGrid> {
        grid::build(reference)
    }

    pub fn events_by_day<'a>(
        &self,
        grid: &MonthGrid,
        events: &'a [Event],
    ) -> BTreeMap<NaiveDate, Vec<&'a Event>> {
        grid.bucket_events(events, &self.timezone)
    }

    pub fn is_medical_record_current(&self, expiration_month: u32, expiration_year: i32) -> bool {
        validity::is_currently_valid(expiration_month, expiration_year, &self.today())
    }

    pub fn is_carnet_entry_current(&self, entry: &CarnetEntry) -> bool {
        validity::is_entry_current(entry, &self.today())
    }

    pub fn validate_carnet_draft(
        &self,
        draft: &CarnetDraft,
    ) -> Result<ValidatedDates, Vec<ValidationError>> {
        validity::validate_draft(draft, self.today())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{DateTime, TimeDelta, Utc};
    use petcare_models::{
        carnet::{CarnetKind, ExpirationMonth},
        event::{EventKind, EventStatus},
    };
    use petcare_scheduler::{FiredNotification, LocalNotificationDispatcher, ManualClock};
    use tokio::sync::mpsc;

    use super::*;
    use crate::storage::{InMemoryEventStore, NewEvent, UpdateEvent};

    struct TestContext {
        engine: CareEngine,
        clock: ManualClock,
        fired: mpsc::UnboundedReceiver<FiredNotification>,
    }

    impl TestContext {
        fn new(now: DateTime<Utc>, timezone: Tz) -> Self {
            let clock = ManualClock::new(now);
            let (dispatcher, fired) = LocalNotificationDispatcher::new(Arc::new(clock.clone()));
            let engine = CareEngine::new(Arc::new(dispatcher), Arc::new(clock.clone()), timezone);

            Self {
                engine,
                clock,
                fired,
            }
        }
    }

    fn now() -> DateTime<Utc> {
        "2025-05-31T12:00:00Z".parse().unwrap()
    }

    fn offsets() -> Vec<ReminderOffset> {
        vec![
            ReminderOffset::minutes(5),
            ReminderOffset::minutes(3),
            ReminderOffset::minutes(1),
        ]
    }

    fn event(id: EventId, start_time: DateTime<Utc>) -> Event {
        Event {
            id,
            title: "Deworming".to_owned(),
            kind: EventKind::Vaccine,
            start_time,
            status: EventStatus::Pending,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fired_reminders_leave_the_schedule() {
        let mut ctx = TestContext::new(now(), Tz::UTC);
        let event = event(1, now() + TimeDelta::minutes(10));

        let report = ctx.engine.on_event_created(&event, &offsets()).await;
        assert_eq!(report.scheduled, offsets());

        tokio::time::sleep(Duration::from_secs(5 * 60 + 1)).await;
        ctx.clock.advance(TimeDelta::seconds(5 * 60 + 1));
        let fired = ctx.fired.try_recv().unwrap();
        assert_eq!(fired.request.body, "Starts in 5 minutes.");

        let removed = ctx
            .engine
            .on_reminder_fired(&fired.handle, &fired.request.payload)
            .await;

        assert_eq!(removed.map(|r| r.offset), Some(ReminderOffset::minutes(5)));
        assert_eq!(ctx.engine.scheduled_reminders(1).await.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn deleted_event_never_fires() {
        let mut ctx = TestContext::new(now(), Tz::UTC);
        let event = event(1, now() + TimeDelta::minutes(10));
        ctx.engine.on_event_created(&event, &offsets()).await;

        ctx.engine.on_event_deleted(1).await;
        tokio::time::sleep(Duration::from_secs(15 * 60)).await;

        assert!(ctx.fired.try_recv().is_err());
        assert!(ctx.engine.scheduled_reminders(1).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn updated_event_fires_at_the_new_time_only() {
        let mut ctx = TestContext::new(now(), Tz::UTC);
        let mut event = event(1, now() + TimeDelta::hours(1));
        ctx.engine
            .on_event_created(&event, &[ReminderOffset::minutes(5)])
            .await;

        event.start_time = now() + TimeDelta::minutes(10);
        ctx.engine
            .on_event_updated(&event, &[ReminderOffset::minutes(5)])
            .await;

        tokio::time::sleep(Duration::from_secs(6 * 60)).await;
        assert!(ctx.fired.try_recv().is_ok());

        tokio::time::sleep(Duration::from_secs(60 * 60)).await;
        assert!(ctx.fired.try_recv().is_err());
    }

    #[tokio::test]
    async fn foreign_payload_is_ignored() {
        let ctx = TestContext::new(now(), Tz::UTC);

        let removed = ctx
            .engine
            .on_reminder_fired(&NotificationHandle::new("local-0"), &NotificationPayload::new())
            .await;

        assert!(removed.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn restore_schedules_pending_events_from_store() {
        let ctx = TestContext::new(now(), Tz::UTC);
        let store = InMemoryEventStore::new();
        let upcoming = store
            .insert(NewEvent {
                title: "Bath".to_owned(),
                kind: EventKind::Grooming,
                start_time: now() + TimeDelta::days(2),
            })
            .await
            .unwrap();
        let done = store
            .insert(NewEvent {
                title: "Rabies".to_owned(),
                kind: EventKind::Vaccine,
                start_time: now() + TimeDelta::days(3),
            })
            .await
            .unwrap();
        store
            .update(UpdateEvent {
                id: done.id,
                title: None,
                start_time: None,
                status: Some(EventStatus::Completed),
            })
            .await
            .unwrap();

        let reports = ctx.engine.restore(&store, &offsets()).await.unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(ctx.engine.scheduled_reminders(upcoming.id).await.len(), 3);
        assert!(ctx.engine.scheduled_reminders(done.id).await.is_empty());
        let (_, done_report) = reports.iter().find(|(id, _)| *id == done.id).unwrap();
        assert_eq!(done_report.skipped_inactive, offsets());
    }

    #[tokio::test]
    async fn today_follows_the_configured_timezone() {
        // 01:00 UTC on June 1st is still May 31st in Buenos Aires.
        let instant = "2025-06-01T01:00:00Z".parse().unwrap();
        let ctx = TestContext::new(instant, chrono_tz::America::Argentina::Buenos_Aires);

        assert_eq!(ctx.engine.today(), NaiveDate::from_ymd_opt(2025, 5, 31).unwrap());
        assert!(ctx.engine.is_medical_record_current(5, 2025));

        ctx.clock.advance(TimeDelta::hours(3));
        assert!(!ctx.engine.is_medical_record_current(5, 2025));
    }

    #[tokio::test]
    async fn month_grid_buckets_events() {
        let ctx = TestContext::new(now(), Tz::UTC);
        let events = vec![event(1, now()), event(2, now() + TimeDelta::days(60))];

        let grid = ctx.engine.get_month_grid(ctx.engine.today()).unwrap();
        let buckets = ctx.engine.events_by_day(&grid, &events);

        assert_eq!(grid.cells().len(), 42);
        assert_eq!(buckets.len(), 1);
        assert!(buckets.contains_key(&ctx.engine.today()));
    }

    #[tokio::test]
    async fn carnet_entry_stays_current_through_its_expiration_month() {
        let ctx = TestContext::new(now(), Tz::UTC);
        let entry = CarnetEntry {
            kind: CarnetKind::Deworming,
            name: "Milbemax".to_owned(),
            application_date: NaiveDate::from_ymd_opt(2025, 3, 2).unwrap(),
            next_dose_date: None,
            expiration: ExpirationMonth {
                year: 2025,
                month: 6,
            },
        };

        assert!(ctx.engine.is_carnet_entry_current(&entry));

        ctx.clock.set("2025-06-30T23:59:59Z".parse().unwrap());
        assert!(ctx.engine.is_carnet_entry_current(&entry));

        ctx.clock.advance(TimeDelta::seconds(1));
        assert!(!ctx.engine.is_carnet_entry_current(&entry));
    }

    #[tokio::test]
    async fn carnet_draft_is_checked_against_today() {
        let ctx = TestContext::new(now(), Tz::UTC);
        let draft = CarnetDraft {
            application_date: "2025-06-01".to_owned(),
            next_dose_date: None,
            expiration_month: 6,
            expiration_year: 2026,
        };

        let errors = ctx.engine.validate_carnet_draft(&draft).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::FutureApplicationDate("2025-06-01".to_owned())]
        );

        ctx.clock.advance(TimeDelta::days(1));
        assert!(ctx.engine.validate_carnet_draft(&draft).is_ok());
    }
}
