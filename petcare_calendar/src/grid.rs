use std::collections::BTreeMap;

use chrono::{Datelike, Days, NaiveDate, TimeZone};
use petcare_models::event::Event;

/// Six weeks of seven days.
pub const GRID_CELLS: usize = 42;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CalendarCell {
    pub date: NaiveDate,
    pub is_current_month: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthGrid {
    first_of_month: NaiveDate,
    cells: Vec<CalendarCell>,
}

/// Builds the Monday-first month view around `reference`: trailing days of
/// the previous month, the whole month, then days of the next month until
/// there are [`GRID_CELLS`] cells.
///
/// # Panics
///
/// For reference dates within a few weeks of the limits of [`NaiveDate`].
/// `None` when the grid would run past the dates chrono can represent.
pub fn build(reference: NaiveDate) -> Option<MonthGrid> {
    let first_of_month = reference.with_day(1)?;
    let leading_days = first_of_month.weekday().num_days_from_monday();
    let grid_start = first_of_month.checked_sub_days(Days::new(leading_days.into()))?;

    let cells: Vec<_> = grid_start
        .iter_days()
        .take(GRID_CELLS)
        .map(|date| CalendarCell {
            date,
            is_current_month: date.year() == first_of_month.year()
                && date.month() == first_of_month.month(),
        })
        .collect();

    (cells.len() == GRID_CELLS).then_some(MonthGrid {
        first_of_month,
        cells,
    })
}

impl MonthGrid {
    pub fn cells(&self) -> &[CalendarCell] {
        &self.cells
    }

    pub fn first_of_month(&self) -> NaiveDate {
        self.first_of_month
    }

    pub fn weeks(&self) -> impl Iterator<Item = &[CalendarCell]> {
        self.cells.chunks(7)
    }

    pub fn current_month_days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.cells
            .iter()
            .filter(|cell| cell.is_current_month)
            .map(|cell| cell.date)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        match (self.cells.first(), self.cells.last()) {
            (Some(first), Some(last)) => (first.date..=last.date).contains(&date),
            _ => false,
        }
    }

    /// Groups events by their local start date, keeping only days shown in
    /// the grid. Events of one day keep their input order.
    pub fn bucket_events<'a, Tz: TimeZone>(
        &self,
        events: &'a [Event],
        timezone: &Tz,
    ) -> BTreeMap<NaiveDate, Vec<&'a Event>> {
        let mut buckets: BTreeMap<NaiveDate, Vec<&Event>> = BTreeMap::new();
        for event in events {
            let day = event.start_time.with_timezone(timezone).date_naive();
            if self.contains(day) {
                buckets.entry(day).or_default().push(event);
            }
        }

        buckets
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc, Weekday};
    use chrono_tz::America::Sao_Paulo;
    use petcare_models::event::{EventKind, EventStatus};
    use proptest::prelude::*;

    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn days_in_month(year: i32, month: u32) -> usize {
        let first = date(year, month, 1);
        let next = first.checked_add_months(chrono::Months::new(1)).unwrap();
        (next - first).num_days() as usize
    }

    fn event(id: i64, start_time: &str) -> Event {
        Event {
            id,
            title: format!("Event {id}"),
            kind: EventKind::Grooming,
            start_time: start_time.parse::<DateTime<Utc>>().unwrap(),
            status: EventStatus::Pending,
        }
    }

    #[test]
    fn month_starting_on_monday_has_no_leading_days() {
        // September 2025 starts on a Monday.
        let grid = build(date(2025, 9, 17)).unwrap();

        assert_eq!(grid.cells()[0].date, date(2025, 9, 1));
        assert!(grid.cells()[0].is_current_month);
        assert_eq!(grid.cells()[30].date, date(2025, 10, 1));
        assert_eq!(grid.cells()[41].date, date(2025, 10, 12));
    }

    #[test]
    fn month_starting_on_sunday_has_six_leading_days() {
        // June 2025 starts on a Sunday.
        let grid = build(date(2025, 6, 1)).unwrap();

        assert_eq!(grid.cells()[0].date, date(2025, 5, 26));
        assert!(!grid.cells()[5].is_current_month);
        assert_eq!(grid.cells()[6].date, date(2025, 6, 1));
        assert!(grid.cells()[6].is_current_month);
    }

    #[test]
    fn leap_february_is_complete() {
        let grid = build(date(2024, 2, 10)).unwrap();

        assert_eq!(grid.current_month_days().count(), 29);
        assert_eq!(grid.current_month_days().last(), Some(date(2024, 2, 29)));
    }

    #[test]
    fn weeks_start_on_monday() {
        let grid = build(date(2025, 12, 25)).unwrap();

        assert_eq!(grid.weeks().count(), 6);
        for week in grid.weeks() {
            assert_eq!(week.len(), 7);
            assert_eq!(week[0].date.weekday(), Weekday::Mon);
        }
    }

    #[test]
    fn events_are_bucketed_by_local_day() {
        let grid = build(date(2025, 3, 15)).unwrap();
        let events = vec![
            event(1, "2025-03-10T09:00:00Z"),
            // Still March 10th in São Paulo (UTC-3).
            event(2, "2025-03-11T01:30:00Z"),
            event(3, "2025-06-01T09:00:00Z"),
        ];

        let buckets = grid.bucket_events(&events, &Sao_Paulo);

        assert_eq!(buckets.len(), 1);
        let ids: Vec<_> = buckets[&date(2025, 3, 10)].iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn trailing_days_of_grid_are_bucketed() {
        let grid = build(date(2025, 3, 15)).unwrap();
        let events = vec![event(1, "2025-04-03T12:00:00Z")];

        let buckets = grid.bucket_events(&events, &Utc);

        assert!(buckets.contains_key(&date(2025, 4, 3)));
    }

    #[test]
    fn last_representable_month_has_no_grid() {
        // Trailing cells of the final December would fall after NaiveDate::MAX.
        assert!(build(NaiveDate::MAX).is_none());
        assert!(build(date(2025, 12, 31)).is_some());
    }

    proptest! {
        #[test]
        fn grid_always_has_42_cells_and_one_month_run(
            year in 1900i32..2200,
            month in 1u32..=12,
            day in 1u32..=28,
        ) {
            let grid = build(date(year, month, day)).unwrap();
            let cells = grid.cells();

            prop_assert_eq!(cells.len(), GRID_CELLS);

            let first = cells.iter().position(|c| c.is_current_month).unwrap();
            let run = cells[first..].iter().take_while(|c| c.is_current_month).count();
            prop_assert_eq!(run, days_in_month(year, month));
            prop_assert_eq!(cells.iter().filter(|c| c.is_current_month).count(), run);
            prop_assert_eq!(cells[0].date.weekday(), Weekday::Mon);

            for pair in cells.windows(2) {
                prop_assert_eq!(pair[0].date.succ_opt(), Some(pair[1].date));
            }
        }
    }
}
