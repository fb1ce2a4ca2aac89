//! Day strip for the horizon and the days that actually have something bookable.

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::model::{Occurrence, MAX_HORIZON_WEEKS};

/// One calendar day in the display horizon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayDescriptor {
    pub date: NaiveDate,
    pub label: String,
}

/// `horizon_weeks * 7` consecutive days starting at `today`, with
/// `horizon_weeks` capped at [`MAX_HORIZON_WEEKS`].
///
/// Day 0 is labelled "Today", day 1 "Tmrw", the rest by weekday ("Wed").
pub fn build_days(today: NaiveDate, horizon_weeks: u32) -> Vec<DayDescriptor> {
    (0..u64::from(horizon_weeks.min(MAX_HORIZON_WEEKS)) * 7)
        .filter_map(|offset| {
            let date = today.checked_add_days(Days::new(offset))?;
            let label = match offset {
                0 => "Today".to_string(),
                1 => "Tmrw".to_string(),
                _ => date.format("%a").to_string(),
            };
            Some(DayDescriptor { date, label })
        })
        .collect()
}

/// The days with at least one occurrence on the same local calendar day.
pub fn enabled_days(days: &[DayDescriptor], occurrences: &[Occurrence]) -> Vec<DayDescriptor> {
    days.iter()
        .filter(|day| occurrences.iter().any(|o| o.date.date_naive() == day.date))
        .cloned()
        .collect()
}

/// The day a viewer should have selected.
///
/// Keeps `current` while it is still enabled, otherwise falls back to the first
/// enabled day. With nothing enabled the current selection is left alone.
pub fn select_day(current: Option<NaiveDate>, enabled: &[DayDescriptor]) -> Option<NaiveDate> {
    let Some(first) = enabled.first() else {
        return current;
    };
    match current {
        Some(day) if enabled.iter().any(|d| d.date == day) => Some(day),
        _ => Some(first.date),
    }
}
