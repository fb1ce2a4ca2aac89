//! Text and JSON output for `slots show`.

use std::fmt::Write as _;

use chrono::NaiveDate;
use serde::Serialize;
use slot_engine::topics::DayPeriod;
use slot_engine::{DayDescriptor, Occurrence, Schedule};

/// JSON document printed by `slots show --json`.
#[derive(Serialize)]
pub struct Report<'a> {
    pub name: Option<&'a str>,
    pub timezone: &'a str,
    #[serde(flatten)]
    pub schedule: &'a Schedule,
}

pub fn header(name: Option<&str>) -> String {
    match name {
        Some(name) => format!("Schedule with {}", name),
        None => "Schedule".to_string(),
    }
}

/// One-line day strip: `[label]` is the selected day, `(label)` has no slots.
pub fn day_strip(schedule: &Schedule) -> String {
    schedule
        .days
        .iter()
        .map(|day| {
            let text = format!("{} {}", day.label, day.date.format("%m-%d"));
            if Some(day.date) == schedule.selected_day {
                format!("[{}]", text)
            } else if is_enabled(schedule, day) {
                text
            } else {
                format!("({})", text)
            }
        })
        .collect::<Vec<_>>()
        .join("  ")
}

fn is_enabled(schedule: &Schedule, day: &DayDescriptor) -> bool {
    schedule.enabled_days.iter().any(|d| d.date == day.date)
}

/// Occurrences grouped under a heading per local day.
///
/// With `only` set, just that day is listed.
pub fn occurrences(schedule: &Schedule, only: Option<NaiveDate>) -> String {
    let mut out = String::new();
    for day in &schedule.enabled_days {
        if only.is_some_and(|d| d != day.date) {
            continue;
        }
        let _ = writeln!(out, "{} {}", day.label, day.date.format("%Y-%m-%d"));
        for o in schedule
            .occurrences
            .iter()
            .filter(|o| o.date.date_naive() == day.date)
        {
            out.push_str(&occurrence_line(o));
        }
    }
    out
}

fn occurrence_line(o: &Occurrence) -> String {
    let mut line = format!(
        "  {}-{}  {} ({})\n",
        o.date.format("%H:%M"),
        o.end_date.format("%H:%M"),
        o.summary,
        DayPeriod::of(o).label()
    );
    for overlap in &o.overlaps {
        let who = if overlap.private { "busy" } else { overlap.name.as_str() };
        let _ = writeln!(line, "      overlaps {} at {}", who, overlap.date.format("%H:%M"));
    }
    line
}
