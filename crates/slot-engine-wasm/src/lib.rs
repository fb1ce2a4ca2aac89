//! WASM bindings for slot-engine.
//!
//! Exposes the schedule pipeline and the topic list to a JavaScript
//! presentation layer via `wasm-bindgen`. Everything crosses the boundary as a
//! JSON string; the JavaScript side owns fetching, parsing and rendering.
//!
//! ## Build process
//!
//! ```sh
//! cargo build -p slot-engine-wasm --target wasm32-unknown-unknown --release
//! wasm-bindgen --target web --out-dir packages/open-slots-js/wasm/ \
//!   target/wasm32-unknown-unknown/release/slot_engine_wasm.wasm
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use slot_engine::model::parse_timezone;
use slot_engine::schedule::DEFAULT_HORIZON_WEEKS;
use slot_engine::{
    ComponentKind, DayDescriptor, Occurrence, OverlapRecord, RawEvent, Schedule, ScheduleRequest,
    SourceResult, TopicRegistry,
};
use wasm_bindgen::prelude::*;

// ---------------------------------------------------------------------------
// Input DTOs
// ---------------------------------------------------------------------------

/// Arguments of one `computeSchedule` call.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleInput {
    now: String,
    timezone: String,
    #[serde(default)]
    horizon_weeks: Option<u32>,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    selected_day: Option<String>,
    #[serde(default)]
    primary: Option<SourceInput>,
    #[serde(default)]
    plans: Vec<Option<SourceInput>>,
}

/// `{data}` once parsed, `{error}` once failed, `null` while still loading.
#[derive(Deserialize)]
struct SourceInput {
    #[serde(default)]
    data: Option<EventsInput>,
    #[serde(default)]
    error: Option<String>,
}

/// Parsers hand records over either as a list or keyed by uid.
#[derive(Deserialize)]
#[serde(untagged)]
enum EventsInput {
    List(Vec<EventInput>),
    Keyed(BTreeMap<String, EventInput>),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventInput {
    uid: String,
    #[serde(default)]
    summary: String,
    start: String,
    end: String,
    #[serde(default)]
    rrule: Option<String>,
    #[serde(default)]
    transparency: Option<String>,
    /// iCalendar component name; `VEVENT` when omitted.
    #[serde(default, rename = "type")]
    component: Option<String>,
    #[serde(default)]
    recurrences: Vec<OverrideInput>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OverrideInput {
    recurrence_id: String,
    start: String,
    end: String,
}

// ---------------------------------------------------------------------------
// Output DTOs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleDto {
    ready: bool,
    occurrences: Vec<OccurrenceDto>,
    days: Vec<DayDto>,
    enabled_days: Vec<DayDto>,
    selected_day: Option<String>,
    skipped: Vec<SkippedDto>,
    source_errors: Vec<SourceErrorDto>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OccurrenceDto {
    id: String,
    source_id: String,
    summary: String,
    transparency: Option<String>,
    date: String,
    end_date: String,
    overlaps: Vec<OverlapDto>,
}

#[derive(Serialize)]
struct OverlapDto {
    id: String,
    date: String,
    blocks: Vec<String>,
    name: String,
    private: bool,
}

#[derive(Serialize)]
struct DayDto {
    date: String,
    label: String,
}

#[derive(Serialize)]
struct SkippedDto {
    uid: String,
    reason: String,
}

#[derive(Serialize)]
struct SourceErrorDto {
    source: String,
    message: String,
}

impl From<&OverlapRecord> for OverlapDto {
    fn from(o: &OverlapRecord) -> Self {
        Self {
            id: o.id.clone(),
            date: o.date.to_rfc3339(),
            blocks: o.blocks.clone(),
            name: o.name.clone(),
            private: o.private,
        }
    }
}

impl From<&Occurrence> for OccurrenceDto {
    fn from(o: &Occurrence) -> Self {
        Self {
            id: o.id.clone(),
            source_id: o.source_id.clone(),
            summary: o.summary.clone(),
            transparency: o.transparency.clone(),
            date: o.date.to_rfc3339(),
            end_date: o.end_date.to_rfc3339(),
            overlaps: o.overlaps.iter().map(OverlapDto::from).collect(),
        }
    }
}

impl From<&DayDescriptor> for DayDto {
    fn from(d: &DayDescriptor) -> Self {
        Self {
            date: d.date.format("%Y-%m-%d").to_string(),
            label: d.label.clone(),
        }
    }
}

impl From<&Schedule> for ScheduleDto {
    fn from(s: &Schedule) -> Self {
        Self {
            ready: s.ready,
            occurrences: s.occurrences.iter().map(OccurrenceDto::from).collect(),
            days: s.days.iter().map(DayDto::from).collect(),
            enabled_days: s.enabled_days.iter().map(DayDto::from).collect(),
            selected_day: s.selected_day.map(|d| d.format("%Y-%m-%d").to_string()),
            skipped: s
                .skipped
                .iter()
                .map(|e| SkippedDto {
                    uid: e.uid.clone(),
                    reason: e.reason.clone(),
                })
                .collect(),
            source_errors: s
                .source_errors
                .iter()
                .map(|e| SourceErrorDto {
                    source: e.source.clone(),
                    message: e.message.clone(),
                })
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

/// Parse an ISO 8601 datetime string into `DateTime<Utc>`.
///
/// Accepts RFC 3339 with an offset, or a naive datetime interpreted as UTC.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .map(|ndt| ndt.and_utc())
        .map_err(|e| format!("Invalid datetime '{}': {}", s, e))
}

fn parse_day(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("Invalid day '{}': {}", s, e))
}

fn to_raw_event(input: EventInput) -> Result<RawEvent, String> {
    let mut event = RawEvent::new(
        input.uid,
        input.summary,
        parse_datetime(&input.start)?,
        parse_datetime(&input.end)?,
    );
    event.rrule = input.rrule;
    event.transparency = input.transparency;
    if let Some(name) = input.component.as_deref() {
        event.kind = ComponentKind::from_component_name(name);
    }
    for o in input.recurrences {
        event = event.with_override(
            parse_datetime(&o.recurrence_id)?,
            parse_datetime(&o.start)?,
            parse_datetime(&o.end)?,
        );
    }
    Ok(event)
}

fn to_source(input: Option<SourceInput>) -> Result<SourceResult, String> {
    let Some(input) = input else {
        return Ok(SourceResult::Pending);
    };
    if let Some(error) = input.error {
        return Ok(SourceResult::Failed(error));
    }
    let events = match input.data {
        None => return Ok(SourceResult::Pending),
        Some(EventsInput::List(events)) => events,
        Some(EventsInput::Keyed(events)) => events.into_values().collect(),
    };
    let events = events
        .into_iter()
        .map(to_raw_event)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(SourceResult::from_events(events))
}

fn schedule_json(input_json: &str) -> Result<String, String> {
    let input: ScheduleInput =
        serde_json::from_str(input_json).map_err(|e| format!("Invalid schedule JSON: {}", e))?;

    let timezone = parse_timezone(&input.timezone).map_err(|e| e.to_string())?;
    let mut request = ScheduleRequest::new(parse_datetime(&input.now)?, timezone);
    request.horizon_weeks = input.horizon_weeks.unwrap_or(DEFAULT_HORIZON_WEEKS);
    request.topics = input.topics;
    request.selected_day = input.selected_day.as_deref().map(parse_day).transpose()?;

    let primary = to_source(input.primary)?;
    let plans = input
        .plans
        .into_iter()
        .map(to_source)
        .collect::<Result<Vec<_>, _>>()?;

    let schedule = slot_engine::compute_schedule(&primary, &plans, &request, &TopicRegistry::standard())
        .map_err(|e| e.to_string())?;

    serde_json::to_string(&ScheduleDto::from(&schedule))
        .map_err(|e| format!("Serialization error: {}", e))
}

fn topic_names_json() -> Result<String, String> {
    serde_json::to_string(&TopicRegistry::standard().names())
        .map_err(|e| format!("Serialization error: {}", e))
}

// ---------------------------------------------------------------------------
// WASM exports
// ---------------------------------------------------------------------------

/// Run the schedule pipeline.
///
/// `input_json` is an object of the form
/// `{now, timezone, horizonWeeks?, topics?, selectedDay?, primary, plans?}` where
/// `primary` and each entry of `plans` is `{data}`, `{error}` or `null` (still
/// loading). `data` is an array of records, or an object keyed by uid, each
/// `{uid, summary?, start, end, rrule?, transparency?, type?, recurrences?}`.
///
/// Returns a JSON string with `ready`, `occurrences`, `days`, `enabledDays`,
/// `selectedDay`, `skipped` and `sourceErrors`. Datetimes are RFC 3339 with the
/// viewer's offset.
#[wasm_bindgen(js_name = "computeSchedule")]
pub fn compute_schedule(input_json: &str) -> Result<String, JsValue> {
    schedule_json(input_json).map_err(|e| JsValue::from_str(&e))
}

/// Names of the built-in topics, sorted, as a JSON array.
#[wasm_bindgen(js_name = "topicNames")]
pub fn topic_names() -> Result<String, JsValue> {
    topic_names_json().map_err(|e| JsValue::from_str(&e))
}
