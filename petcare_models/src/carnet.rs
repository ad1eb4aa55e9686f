use chrono::NaiveDate;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CarnetKind {
    Vaccine,
    Deworming,
}

/// Month/year a vaccine or deworming batch stops being effective.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ExpirationMonth {
    pub year: i32,
    pub month: u32,
}

#[derive(Debug, Clone)]
pub struct CarnetEntry {
    pub kind: CarnetKind,
    pub name: String,
    pub application_date: NaiveDate,
    pub next_dose_date: Option<NaiveDate>,
    pub expiration: ExpirationMonth,
}
