use std::{collections::BTreeMap, sync::Arc};

use chrono::{Datelike, NaiveDate, TimeDelta};
use petcare::{
    appsettings,
    engine::CareEngine,
    storage::{EventStore, InMemoryEventStore, NewEvent},
};
use petcare_calendar::grid::CalendarCell;
use petcare_models::event::{Event, EventKind};
use petcare_scheduler::{Clock, LocalNotificationDispatcher, SystemClock};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    pretty_env_logger::init();

    let settings = appsettings::load()?;
    let timezone = appsettings::timezone(&settings)?;
    let offsets = settings.reminders.offsets.clone();
    log::info!("Starting reminder engine. [timezone = {timezone}, offsets = {offsets:?}]");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let (dispatcher, mut fired_rx) = LocalNotificationDispatcher::new(Arc::clone(&clock));
    let engine = CareEngine::new(Arc::new(dispatcher), Arc::clone(&clock), timezone);
    let store = InMemoryEventStore::new();

    if let Some(demo) = &settings.demo {
        let event = store
            .insert(NewEvent {
                title: demo.title.clone(),
                kind: EventKind::Checkup,
                start_time: clock.now() + TimeDelta::minutes(demo.starts_in_minutes.into()),
            })
            .await?;
        log::info!("Created demo event. [event_id = {}, start_time = {}]", event.id, event.start_time);
    }

    for (event_id, report) in engine.restore(&store, &offsets).await? {
        log::info!(
            "Reminders restored. [event_id = {event_id}, scheduled = {:?}, skipped_past = {:?}, failed = {:?}]",
            report.scheduled,
            report.skipped_past,
            report.failed_offsets()
        );
    }

    let events = store.get_all().await?;
    let today = engine.today();
    match engine.get_month_grid(today) {
        Some(grid) => {
            let buckets = engine.events_by_day(&grid, &events);
            log::info!("{}", grid.first_of_month().format("%B %Y"));
            for week in grid.weeks() {
                log::info!("{}", render_week(week, &buckets));
            }
        }
        None => log::warn!("No calendar grid for this month. [today = {today}]"),
    }

    loop {
        tokio::select! {
            Some(fired) = fired_rx.recv() => {
                log::info!("🔔 {} {}", fired.request.title, fired.request.body);
                engine.on_reminder_fired(&fired.handle, &fired.request.payload).await;
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}

fn render_week(week: &[CalendarCell], buckets: &BTreeMap<NaiveDate, Vec<&Event>>) -> String {
    week.iter()
        .map(|cell| {
            let marker = if buckets.contains_key(&cell.date) { '*' } else { ' ' };
            if cell.is_current_month {
                format!("{:>3}{marker}", cell.date.day())
            } else {
                format!("{:>3}{marker}", "·")
            }
        })
        .collect()
}
