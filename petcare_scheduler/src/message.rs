use petcare_models::{
    event::{Event, EventKind},
    reminder::ReminderOffset,
};

pub fn reminder_title(event: &Event) -> String {
    match event.kind {
        EventKind::Vaccine => format!("💉 {}", event.title),
        EventKind::Checkup => format!("🩺 {}", event.title),
        EventKind::Grooming => format!("✂️ {}", event.title),
        EventKind::Other => format!("🐾 {}", event.title),
    }
}

/// Body text for a reminder, phrased in the largest whole unit of the offset.
pub fn reminder_body(offset: ReminderOffset) -> String {
    let lead_time = offset.lead_time();
    let (amount, unit) = if lead_time.num_days() >= 1 {
        (lead_time.num_days(), "day")
    } else if lead_time.num_hours() >= 1 {
        (lead_time.num_hours(), "hour")
    } else if lead_time.num_minutes() >= 1 {
        (lead_time.num_minutes(), "minute")
    } else {
        return "Starting now.".to_owned();
    };

    let plural = if amount == 1 { "" } else { "s" };
    format!("Starts in {amount} {unit}{plural}.")
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use petcare_models::event::EventStatus;

    use super::*;

    #[test]
    fn body_uses_largest_unit() {
        assert_eq!(reminder_body(ReminderOffset::days(3)), "Starts in 3 days.");
        assert_eq!(reminder_body(ReminderOffset::hours(1)), "Starts in 1 hour.");
        assert_eq!(reminder_body(ReminderOffset::minutes(90)), "Starts in 1 hour.");
        assert_eq!(reminder_body(ReminderOffset::minutes(5)), "Starts in 5 minutes.");
        assert_eq!(reminder_body(ReminderOffset::seconds(30)), "Starting now.");
    }

    #[test]
    fn title_is_prefixed_by_kind() {
        let event = Event {
            id: 1,
            title: "Rabies booster".to_owned(),
            kind: EventKind::Vaccine,
            start_time: Utc::now(),
            status: EventStatus::Pending,
        };

        assert_eq!(reminder_title(&event), "💉 Rabies booster");
    }
}
