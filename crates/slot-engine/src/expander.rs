//! Occurrence expansion -- converts raw calendar records into concrete dated occurrences.
//!
//! Wraps the `rrule` crate for RFC 5545 recurrence rules. Rules are anchored to the
//! event's start in UTC, so every generated instant is passed through
//! [`crate::dst::correct_utc_anchor`] before windowing.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use rrule::RRuleSet;
use serde::Serialize;
use tracing::{debug, warn};

use crate::dst::correct_utc_anchor;
use crate::error::{EngineError, Result};
use crate::model::{Occurrence, RawEvent, Window};

/// Upper bound on instants generated per rule inside one window.
///
/// The window already bounds enumeration; a rule that still reaches this many
/// instants is reported as unusable rather than truncated.
pub const MAX_INSTANCES: u16 = u16::MAX;

/// A record that could not be expanded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedEvent {
    pub uid: String,
    pub reason: String,
}

/// Output of expanding one calendar source.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Expansion {
    pub occurrences: Vec<Occurrence>,
    pub skipped: Vec<SkippedEvent>,
}

impl Expansion {
    /// Record the outcome of expanding one event. Failures never abort the source.
    pub(crate) fn record(&mut self, event: &RawEvent, result: Result<Vec<Occurrence>>) {
        match result {
            Ok(occurrences) => self.occurrences.extend(occurrences),
            Err(err) => {
                warn!(uid = %event.uid, error = %err, "skipping event with unusable recurrence rule");
                self.skipped.push(SkippedEvent {
                    uid: event.uid.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }

    /// Append another source's expansion.
    pub fn merge(&mut self, other: Expansion) {
        self.occurrences.extend(other.occurrences);
        self.skipped.extend(other.skipped);
    }
}

/// Expand every schedulable record of one calendar source inside `window`.
///
/// Records that are not events are ignored. A record whose rule cannot be parsed is
/// reported in [`Expansion::skipped`] and contributes no occurrences; all other
/// records are still expanded.
pub fn expand<'a, I>(events: I, window: &Window, tz: &Tz) -> Expansion
where
    I: IntoIterator<Item = &'a RawEvent>,
{
    let mut expansion = Expansion::default();
    for event in events.into_iter().filter(|e| e.is_schedulable()) {
        expansion.record(event, expand_event(event, window, tz));
    }
    debug!(
        occurrences = expansion.occurrences.len(),
        skipped = expansion.skipped.len(),
        "expanded calendar source"
    );
    expansion
}

/// Expand a single record, ignoring its component kind.
///
/// Non-recurring records yield at most one occurrence: the event itself when its
/// start lies strictly inside the window.
///
/// # Errors
/// Returns `EngineError::InvalidRule` if the record's rule is empty or unparseable.
pub fn expand_event(event: &RawEvent, window: &Window, tz: &Tz) -> Result<Vec<Occurrence>> {
    if event.rrule.is_none() {
        if window.strictly_contains(event.start) {
            return Ok(vec![Occurrence::singular(event, tz)]);
        }
        return Ok(Vec::new());
    }

    let occurrences = recurrence_instants(event, window)?
        .into_iter()
        .map(|raw| correct_utc_anchor(raw, tz))
        .filter(|date| window.strictly_contains(date.with_timezone(&Utc)))
        .map(|date| Occurrence::instance(event, date))
        .collect();

    Ok(occurrences)
}

/// Raw, uncorrected instants of a recurring record.
///
/// Enumeration starts one day before the window, since the UTC anchoring can move
/// an instance that belongs inside the window to the day before it. Returns an
/// empty list for records without a rule.
///
/// # Errors
/// Returns `EngineError::InvalidRule` if the rule is empty or unparseable.
pub fn recurrence_instants(event: &RawEvent, window: &Window) -> Result<Vec<DateTime<Utc>>> {
    let Some(rule) = event.rrule.as_deref() else {
        return Ok(Vec::new());
    };
    if rule.trim().is_empty() {
        return Err(EngineError::InvalidRule(format!(
            "empty RRULE for event '{}'",
            event.uid
        )));
    }

    let rrule_set: RRuleSet = build_rule_text(rule, event.start).parse().map_err(|e| {
        EngineError::InvalidRule(format!("event '{}': {}", event.uid, e))
    })?;

    let after = (window.start - Duration::days(1)).with_timezone(&rrule::Tz::UTC);
    let before = window.end.with_timezone(&rrule::Tz::UTC);
    let result = rrule_set.after(after).before(before).all(MAX_INSTANCES);
    if result.limited {
        return Err(EngineError::InvalidRule(format!(
            "event '{}': more than {} instances in the window",
            event.uid, MAX_INSTANCES
        )));
    }

    Ok(result
        .dates
        .into_iter()
        .map(|dt| dt.with_timezone(&Utc))
        .collect())
}

/// Build the iCalendar rule block handed to the `rrule` parser.
///
/// A bare RRULE value is anchored at the event start in UTC with no TZID; a block
/// that already carries its own `DTSTART` is used as is.
fn build_rule_text(rule: &str, start: DateTime<Utc>) -> String {
    let rule = rule.trim();
    if rule.to_ascii_uppercase().contains("DTSTART") {
        return rule.to_string();
    }
    let value = rule.strip_prefix("RRULE:").unwrap_or(rule);
    let parts: Vec<String> = value.split(';').map(utc_until).collect();
    format!(
        "DTSTART:{}\nRRULE:{}",
        start.format("%Y%m%dT%H%M%SZ"),
        parts.join(";")
    )
}

/// With a UTC `DTSTART`, `UNTIL` must be UTC too. A date-only `UNTIL` covers
/// its whole day; a floating one is read as UTC like the rest of the rule.
fn utc_until(part: &str) -> String {
    let Some((key, until)) = part.split_once('=') else {
        return part.to_string();
    };
    if !key.trim().eq_ignore_ascii_case("UNTIL") {
        return part.to_string();
    }
    let until = until.trim();
    if until.len() == 8 && until.bytes().all(|b| b.is_ascii_digit()) {
        format!("{}={}T235959Z", key, until)
    } else if !until.ends_with(['Z', 'z']) {
        format!("{}={}Z", key, until)
    } else {
        part.to_string()
    }
}
