use serde::Deserialize;

use crate::reminder::ReminderOffset;

#[derive(Deserialize, Debug)]
pub struct ReminderSettings {
    pub offsets: Vec<ReminderOffset>,
}

#[derive(Deserialize, Debug)]
pub struct CalendarSettings {
    /// IANA zone name, e.g. `Europe/Madrid`.
    pub timezone: String,
}

#[derive(Deserialize, Debug)]
pub struct DemoSettings {
    pub title: String,
    pub starts_in_minutes: u32,
}

#[derive(Deserialize, Debug)]
pub struct Settings {
    pub reminders: ReminderSettings,
    pub calendar: CalendarSettings,
    pub demo: Option<DemoSettings>,
}
