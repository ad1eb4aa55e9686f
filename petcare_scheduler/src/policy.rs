use std::collections::HashSet;

use chrono::{DateTime, Utc};
use petcare_models::reminder::ReminderOffset;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PlannedReminder {
    pub offset: ReminderOffset,
    pub trigger_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReminderPlan {
    pub due: Vec<PlannedReminder>,
    pub skipped_past: Vec<ReminderOffset>,
}

/// Trigger times for every distinct offset, split into the ones still ahead
/// of `now` and the ones that are not. A trigger exactly at `now` is past.
pub fn plan(
    start_time: DateTime<Utc>,
    offsets: &[ReminderOffset],
    now: DateTime<Utc>,
) -> ReminderPlan {
    let mut plan = ReminderPlan::default();

    for offset in distinct(offsets) {
        match start_time.checked_sub_signed(offset.lead_time()) {
            Some(trigger_at) if trigger_at > now => {
                plan.due.push(PlannedReminder { offset, trigger_at })
            }
            _ => plan.skipped_past.push(offset),
        }
    }

    plan
}

/// Offsets with duplicates removed, first occurrence wins.
pub fn distinct(offsets: &[ReminderOffset]) -> Vec<ReminderOffset> {
    let mut seen = HashSet::with_capacity(offsets.len());
    offsets
        .iter()
        .copied()
        .filter(|offset| seen.insert(*offset))
        .collect()
}
