//! Time-dependent rules for vaccine and deworming records.
//!
//! Every guard is independent so a form can show all failing fields at once;
//! [`validate_draft`] runs them together and collects the failures.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use petcare_models::carnet::{CarnetEntry, ExpirationMonth};
use thiserror::Error;

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RecordField {
    ApplicationDate,
    NextDoseDate,
    Expiration,
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordField::ApplicationDate => f.write_str("application date"),
            RecordField::NextDoseDate => f.write_str("next dose date"),
            RecordField::Expiration => f.write_str("expiration"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Application date '{0}' must be a valid date that is not in the future")]
    FutureApplicationDate(String),

    #[error("The {field} '{value}' is not a valid date")]
    UnparseableDate { field: RecordField, value: String },

    #[error("Expiration month {0} is not between 1 and 12")]
    InvalidExpirationMonth(u32),

    #[error("Expiration {month:02}/{year} is before the application date")]
    ExpirationBeforeApplication { month: u32, year: i32 },

    #[cfg(feature = "strict-next-dose")]
    #[error("Next dose date {next_dose} must be after the application date {application}")]
    NextDoseNotAfterApplication {
        application: NaiveDate,
        next_dose: NaiveDate,
    },
}

impl ValidationError {
    pub fn field(&self) -> RecordField {
        match self {
            ValidationError::FutureApplicationDate(_) => RecordField::ApplicationDate,
            ValidationError::UnparseableDate { field, .. } => *field,
            ValidationError::InvalidExpirationMonth(_)
            | ValidationError::ExpirationBeforeApplication { .. } => RecordField::Expiration,
            #[cfg(feature = "strict-next-dose")]
            ValidationError::NextDoseNotAfterApplication { .. } => RecordField::NextDoseDate,
        }
    }
}

/// A record is current through the last day of its expiration month.
pub fn is_currently_valid(
    expiration_month: u32,
    expiration_year: i32,
    today: &impl Datelike,
) -> bool {
    expiration_year > today.year()
        || (expiration_year == today.year() && expiration_month >= today.month())
}

pub fn is_entry_current(entry: &CarnetEntry, today: &impl Datelike) -> bool {
    is_currently_valid(entry.expiration.month, entry.expiration.year, today)
}

pub fn parse_record_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

/// Unparseable input is rejected the same way as a future date.
pub fn validate_application_date(
    value: &str,
    today: NaiveDate,
) -> Result<NaiveDate, ValidationError> {
    match parse_record_date(value) {
        Some(date) if date <= today => Ok(date),
        _ => Err(ValidationError::FutureApplicationDate(value.to_owned())),
    }
}

/// A missing or blank next dose is fine; anything else must parse.
pub fn validate_next_dose(value: Option<&str>) -> Result<Option<NaiveDate>, ValidationError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_record_date(value)
            .map(Some)
            .ok_or_else(|| ValidationError::UnparseableDate {
                field: RecordField::NextDoseDate,
                value: value.to_owned(),
            }),
    }
}

pub fn validate_expiration(
    month: u32,
    year: i32,
    application_date: Option<NaiveDate>,
) -> Result<ExpirationMonth, ValidationError> {
    if !(1..=12).contains(&month) {
        return Err(ValidationError::InvalidExpirationMonth(month));
    }

    let expiration = ExpirationMonth { year, month };
    if let Some(application) = application_date {
        let applied = ExpirationMonth {
            year: application.year(),
            month: application.month(),
        };
        if expiration < applied {
            return Err(ValidationError::ExpirationBeforeApplication { month, year });
        }
    }

    Ok(expiration)
}

#[cfg(feature = "strict-next-dose")]
pub fn validate_next_dose_order(
    application: NaiveDate,
    next_dose: NaiveDate,
) -> Result<(), ValidationError> {
    if next_dose <= application {
        return Err(ValidationError::NextDoseNotAfterApplication {
            application,
            next_dose,
        });
    }

    Ok(())
}

/// Raw form input for a carnet entry.
#[derive(Debug, Clone)]
pub struct CarnetDraft {
    pub application_date: String,
    pub next_dose_date: Option<String>,
    pub expiration_month: u32,
    pub expiration_year: i32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ValidatedDates {
    pub application_date: NaiveDate,
    pub next_dose_date: Option<NaiveDate>,
    pub expiration: ExpirationMonth,
}

pub fn validate_draft(
    draft: &CarnetDraft,
    today: NaiveDate,
) -> Result<ValidatedDates, Vec<ValidationError>> {
    let application = validate_application_date(&draft.application_date, today);
    let next_dose = validate_next_dose(draft.next_dose_date.as_deref());
    let expiration = validate_expiration(
        draft.expiration_month,
        draft.expiration_year,
        application.as_ref().ok().copied(),
    );

    match (application, next_dose, expiration) {
        (Ok(application_date), Ok(next_dose_date), Ok(expiration)) => {
            #[cfg(feature = "strict-next-dose")]
            if let Some(next_dose) = next_dose_date {
                validate_next_dose_order(application_date, next_dose).map_err(|e| vec![e])?;
            }

            Ok(ValidatedDates {
                application_date,
                next_dose_date,
                expiration,
            })
        }
        (application, next_dose, expiration) => Err([
            application.err(),
            next_dose.err(),
            expiration.err(),
        ]
        .into_iter()
        .flatten()
        .collect()),
    }
}
