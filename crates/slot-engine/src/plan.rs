//! Expansion of "plan" calendars, the busy blocks primary occurrences are checked against.

use chrono::Duration;
use chrono_tz::Tz;
use tracing::debug;

use crate::expander::{expand_event, Expansion};
use crate::model::{Occurrence, RawEvent, Window};

/// Plan events must be shorter than a day, unless the summary is all capitals
/// (public all-day blocks such as "OUT OF OFFICE").
pub fn is_plan_eligible(event: &RawEvent) -> bool {
    event.duration() < Duration::days(1) || is_shouted(&event.summary)
}

fn is_shouted(summary: &str) -> bool {
    !summary.is_empty()
        && summary
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_whitespace())
}

/// Expand every eligible record of one plan calendar inside `window`.
///
/// Each record contributes its recurrence exceptions as well as its regular
/// expansion. Both paths are windowed the same way and are not de-duplicated
/// against each other.
pub fn expand_plan<'a, I>(events: I, window: &Window, tz: &Tz) -> Expansion
where
    I: IntoIterator<Item = &'a RawEvent>,
{
    let mut expansion = Expansion::default();
    for event in events
        .into_iter()
        .filter(|e| e.is_schedulable() && is_plan_eligible(e))
    {
        let result = expand_event(event, window, tz).map(|regular| {
            let mut occurrences = exception_occurrences(event, window, tz);
            occurrences.extend(regular);
            occurrences
        });
        expansion.record(event, result);
    }
    debug!(
        occurrences = expansion.occurrences.len(),
        skipped = expansion.skipped.len(),
        "expanded plan source"
    );
    expansion
}

/// Occurrences taken from a record's exception map.
///
/// The override's start is used as is; the end keeps the base event's duration.
pub fn exception_occurrences(event: &RawEvent, window: &Window, tz: &Tz) -> Vec<Occurrence> {
    event
        .recurrences
        .values()
        .filter(|o| window.strictly_contains(o.start))
        .map(|o| Occurrence::instance(event, o.start.with_timezone(tz)))
        .collect()
}

/// Expand several plan calendars and flatten the result.
pub fn expand_plans<'a, S, I>(sources: S, window: &Window, tz: &Tz) -> Expansion
where
    S: IntoIterator<Item = I>,
    I: IntoIterator<Item = &'a RawEvent>,
{
    sources
        .into_iter()
        .map(|events| expand_plan(events, window, tz))
        .fold(Expansion::default(), |mut all, one| {
            all.merge(one);
            all
        })
}
