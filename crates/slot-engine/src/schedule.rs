//! The full pipeline from fetched calendar sources to a displayable schedule.
//!
//! This is a pure function of its inputs. Hosts call [`compute_schedule`] again
//! whenever a source resolves or the viewer changes topics or the selected day.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::debug;

use crate::days::{build_days, enabled_days, select_day, DayDescriptor};
use crate::error::Result;
use crate::expander::{expand, SkippedEvent};
use crate::model::{Occurrence, RawEvent, Window};
use crate::overlap::annotate;
use crate::plan::expand_plans;
use crate::topics::TopicRegistry;

/// Default horizon, in weeks.
pub const DEFAULT_HORIZON_WEEKS: u32 = 3;

/// State of one calendar source as reported by the fetch collaborator.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SourceResult {
    /// Not fetched yet.
    #[default]
    Pending,
    /// Parsed records keyed by id.
    Ready(HashMap<String, RawEvent>),
    /// The fetch or parse failed.
    Failed(String),
}

impl SourceResult {
    /// A ready source built from a list of records, keyed by uid.
    pub fn from_events<I: IntoIterator<Item = RawEvent>>(events: I) -> Self {
        SourceResult::Ready(events.into_iter().map(|e| (e.uid.clone(), e)).collect())
    }

    pub fn events(&self) -> Option<&HashMap<String, RawEvent>> {
        match self {
            SourceResult::Ready(events) => Some(events),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, SourceResult::Ready(_))
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            SourceResult::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// A failed source, named "primary" or "plan N" (zero-based).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceError {
    pub source: String,
    pub message: String,
}

/// Viewer-side inputs of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleRequest {
    pub now: DateTime<Utc>,
    pub timezone: Tz,
    pub horizon_weeks: u32,
    pub topics: Vec<String>,
    pub selected_day: Option<NaiveDate>,
}

impl ScheduleRequest {
    pub fn new(now: DateTime<Utc>, timezone: Tz) -> Self {
        Self {
            now,
            timezone,
            horizon_weeks: DEFAULT_HORIZON_WEEKS,
            topics: Vec::new(),
            selected_day: None,
        }
    }
}

/// Everything a presentation layer needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schedule {
    /// Filtered occurrences, ascending by start.
    pub occurrences: Vec<Occurrence>,
    /// Every day of the horizon.
    pub days: Vec<DayDescriptor>,
    /// Days with at least one occurrence.
    pub enabled_days: Vec<DayDescriptor>,
    pub selected_day: Option<NaiveDate>,
    /// Records dropped because their recurrence rule could not be used.
    pub skipped: Vec<SkippedEvent>,
    pub source_errors: Vec<SourceError>,
    /// False until the primary and every plan source are ready.
    pub ready: bool,
}

/// Run the whole pipeline.
///
/// While any source is pending or failed the schedule has no occurrences (and so
/// no enabled days); partial results are never produced.
///
/// # Errors
/// Returns `EngineError::UnknownTopic` if a requested topic is not in `registry`,
/// and `EngineError::InvalidWindow` if the horizon is empty or longer than
/// [`crate::model::MAX_HORIZON_WEEKS`].
pub fn compute_schedule(
    primary: &SourceResult,
    plans: &[SourceResult],
    request: &ScheduleRequest,
    registry: &TopicRegistry,
) -> Result<Schedule> {
    registry.validate(&request.topics)?;
    let window = Window::horizon(request.now, request.horizon_weeks)?;
    let tz = request.timezone;
    let days = build_days(request.now.with_timezone(&tz).date_naive(), request.horizon_weeks);
    let source_errors = collect_source_errors(primary, plans);

    let primary_events = match primary.events() {
        Some(events) if plans.iter().all(SourceResult::is_ready) => events,
        _ => {
            debug!(failed = source_errors.len(), "calendar sources not ready");
            return Ok(Schedule {
                occurrences: Vec::new(),
                days,
                enabled_days: Vec::new(),
                selected_day: request.selected_day,
                skipped: Vec::new(),
                source_errors,
                ready: false,
            });
        }
    };

    let primary_expansion = expand(primary_events.values(), &window, &tz);
    let mut plan_expansion = expand_plans(
        plans
            .iter()
            .filter_map(SourceResult::events)
            .map(|events| events.values()),
        &window,
        &tz,
    );

    sort_occurrences(&mut plan_expansion.occurrences);
    let annotated = annotate(primary_expansion.occurrences, &plan_expansion.occurrences);
    let mut occurrences = registry.filter(annotated, &request.topics)?;
    sort_occurrences(&mut occurrences);

    let mut skipped = primary_expansion.skipped;
    skipped.extend(plan_expansion.skipped);
    skipped.sort_by(|a, b| a.uid.cmp(&b.uid));

    let enabled = enabled_days(&days, &occurrences);
    let selected_day = select_day(request.selected_day, &enabled);
    debug!(
        occurrences = occurrences.len(),
        enabled_days = enabled.len(),
        skipped = skipped.len(),
        "computed schedule"
    );

    Ok(Schedule {
        occurrences,
        days,
        enabled_days: enabled,
        selected_day,
        skipped,
        source_errors,
        ready: true,
    })
}

/// Ascending by start; ties broken by id so repeated runs agree.
pub fn sort_occurrences(occurrences: &mut [Occurrence]) {
    occurrences.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
}

fn collect_source_errors(primary: &SourceResult, plans: &[SourceResult]) -> Vec<SourceError> {
    let primary = primary.error().map(|message| SourceError {
        source: "primary".to_string(),
        message: message.to_string(),
    });
    let plans = plans.iter().enumerate().filter_map(|(i, plan)| {
        plan.error().map(|message| SourceError {
            source: format!("plan {}", i),
            message: message.to_string(),
        })
    });
    primary.into_iter().chain(plans).collect()
}
