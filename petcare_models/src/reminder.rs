use std::{fmt, str::FromStr};

use chrono::TimeDelta;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OffsetParseError {
    #[error("Reminder offset cannot be negative")]
    Negative,

    #[error("Invalid reminder offset '{0}', expected e.g. 30s, 5m, 2h or 1d")]
    Invalid(String),
}

/// How long before an event's start a reminder fires.
///
/// Always non-negative and truncated to whole seconds, so two offsets that
/// display the same also compare equal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct ReminderOffset(TimeDelta);

impl ReminderOffset {
    pub fn new(lead_time: TimeDelta) -> Result<Self, OffsetParseError> {
        if lead_time < TimeDelta::zero() {
            return Err(OffsetParseError::Negative);
        }

        Ok(Self(TimeDelta::seconds(lead_time.num_seconds())))
    }

    pub fn seconds(seconds: u32) -> Self {
        Self(TimeDelta::seconds(seconds.into()))
    }

    pub fn minutes(minutes: u32) -> Self {
        Self(TimeDelta::minutes(minutes.into()))
    }

    pub fn hours(hours: u32) -> Self {
        Self(TimeDelta::hours(hours.into()))
    }

    pub fn days(days: u32) -> Self {
        Self(TimeDelta::days(days.into()))
    }

    pub fn lead_time(&self) -> TimeDelta {
        self.0
    }
}

impl fmt::Display for ReminderOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let seconds = self.0.num_seconds();
        match seconds {
            0 => write!(f, "0m"),
            s if s % 86_400 == 0 => write!(f, "{}d", s / 86_400),
            s if s % 3_600 == 0 => write!(f, "{}h", s / 3_600),
            s if s % 60 == 0 => write!(f, "{}m", s / 60),
            s => write!(f, "{s}s"),
        }
    }
}

impl FromStr for ReminderOffset {
    type Err = OffsetParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || OffsetParseError::Invalid(s.to_owned());

        let (amount, unit) = match trimmed.char_indices().last() {
            Some((idx, c)) if c.is_ascii_alphabetic() => (&trimmed[..idx], c),
            Some(_) => (trimmed, 'm'),
            None => return Err(invalid()),
        };

        let amount: i64 = amount.trim().parse().map_err(|_| invalid())?;
        let lead_time = match unit.to_ascii_lowercase() {
            's' => TimeDelta::try_seconds(amount),
            'm' => TimeDelta::try_minutes(amount),
            'h' => TimeDelta::try_hours(amount),
            'd' => TimeDelta::try_days(amount),
            _ => None,
        }
        .ok_or_else(invalid)?;

        Self::new(lead_time)
    }
}

impl TryFrom<String> for ReminderOffset {
    type Error = OffsetParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
