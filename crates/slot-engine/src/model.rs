//! Calendar records as read from a source, and the occurrences derived from them.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Component type of a calendar record. Only [`ComponentKind::Event`] is schedulable.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ComponentKind {
    #[default]
    Event,
    Todo,
    Journal,
    FreeBusy,
    Other(String),
}

impl ComponentKind {
    /// Map an iCalendar component name (`VEVENT`, `VTODO`, ...) to a kind.
    pub fn from_component_name(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "VEVENT" => ComponentKind::Event,
            "VTODO" => ComponentKind::Todo,
            "VJOURNAL" => ComponentKind::Journal,
            "VFREEBUSY" => ComponentKind::FreeBusy,
            other => ComponentKind::Other(other.to_string()),
        }
    }
}

/// An explicit override of one generated occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurrenceOverride {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// A calendar record exactly as the fetch collaborator hands it over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    pub uid: String,
    #[serde(default)]
    pub summary: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// RRULE value (`FREQ=WEEKLY;BYDAY=MO`) or a full rule block with its own `DTSTART`.
    #[serde(default)]
    pub rrule: Option<String>,
    /// Recurrence exceptions keyed by the instant they replace.
    #[serde(default)]
    pub recurrences: BTreeMap<DateTime<Utc>, RecurrenceOverride>,
    /// Present means the event is free/public; absent means busy/private.
    #[serde(default)]
    pub transparency: Option<String>,
    #[serde(default)]
    pub kind: ComponentKind,
}

impl RawEvent {
    /// A one-off, busy event.
    pub fn new(
        uid: impl Into<String>,
        summary: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            uid: uid.into(),
            summary: summary.into(),
            start,
            end,
            rrule: None,
            recurrences: BTreeMap::new(),
            transparency: None,
            kind: ComponentKind::Event,
        }
    }

    pub fn with_rrule(mut self, rrule: impl Into<String>) -> Self {
        self.rrule = Some(rrule.into());
        self
    }

    pub fn with_transparency(mut self, transparency: impl Into<String>) -> Self {
        self.transparency = Some(transparency.into());
        self
    }

    pub fn with_kind(mut self, kind: ComponentKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_override(mut self, recurrence_id: DateTime<Utc>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.recurrences
            .insert(recurrence_id, RecurrenceOverride { start, end });
        self
    }

    /// A `VEVENT` that ends after it starts. Zero-length and inverted records
    /// never reach expansion.
    pub fn is_schedulable(&self) -> bool {
        self.kind == ComponentKind::Event && self.end > self.start
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// One concrete, dated instance of a [`RawEvent`], in the viewer's zone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Occurrence {
    pub id: String,
    pub source_id: String,
    pub summary: String,
    pub transparency: Option<String>,
    pub date: DateTime<Tz>,
    pub end_date: DateTime<Tz>,
    pub overlaps: Vec<OverlapRecord>,
}

impl Occurrence {
    /// The occurrence of a non-recurring event: keeps the plain source uid.
    pub(crate) fn singular(event: &RawEvent, tz: &Tz) -> Self {
        Self {
            id: event.uid.clone(),
            source_id: event.uid.clone(),
            summary: event.summary.clone(),
            transparency: event.transparency.clone(),
            date: event.start.with_timezone(tz),
            end_date: event.end.with_timezone(tz),
            overlaps: Vec::new(),
        }
    }

    /// A generated instance starting at `date`, keeping the source duration.
    pub(crate) fn instance(event: &RawEvent, date: DateTime<Tz>) -> Self {
        Self {
            id: instance_id(&event.uid, &date),
            source_id: event.uid.clone(),
            summary: event.summary.clone(),
            transparency: event.transparency.clone(),
            end_date: date + event.duration(),
            date,
            overlaps: Vec::new(),
        }
    }

    pub fn duration(&self) -> Duration {
        self.end_date - self.date
    }

    pub fn is_private(&self) -> bool {
        self.transparency.is_none()
    }
}

/// `uid@<RFC 3339 start>`; the explicit offset keeps ids unique across DST changes.
pub fn instance_id(uid: &str, date: &DateTime<Tz>) -> String {
    format!("{}@{}", uid, date.to_rfc3339())
}

/// A plan occurrence colliding with a primary occurrence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlapRecord {
    pub id: String,
    pub date: DateTime<Tz>,
    /// Summaries of the primary occurrences this plan block was checked against.
    pub blocks: Vec<String>,
    pub name: String,
    pub private: bool,
}

/// Longest horizon a schedule may cover, in weeks.
pub const MAX_HORIZON_WEEKS: u32 = 260;

/// Half-open expansion window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start >= end {
            return Err(EngineError::InvalidWindow(format!(
                "start {} is not before end {}",
                start.to_rfc3339(),
                end.to_rfc3339()
            )));
        }
        Ok(Self { start, end })
    }

    /// The window a schedule page shows: from `now` to the last day of the horizon.
    ///
    /// The end is `now + weeks - 1 day`, so the final expanded instant lands on the
    /// last labelled day of [`crate::days::build_days`].
    ///
    /// # Errors
    /// Returns `EngineError::InvalidWindow` for zero weeks, more than
    /// [`MAX_HORIZON_WEEKS`], or an end past the representable range.
    pub fn horizon(now: DateTime<Utc>, horizon_weeks: u32) -> Result<Self> {
        if horizon_weeks > MAX_HORIZON_WEEKS {
            return Err(EngineError::InvalidWindow(format!(
                "horizon of {} weeks exceeds the maximum of {}",
                horizon_weeks, MAX_HORIZON_WEEKS
            )));
        }
        let end = now
            .checked_add_signed(Duration::weeks(horizon_weeks as i64) - Duration::days(1))
            .ok_or_else(|| {
                EngineError::InvalidWindow(format!(
                    "horizon of {} weeks from {} is out of range",
                    horizon_weeks,
                    now.to_rfc3339()
                ))
            })?;
        Self::new(now, end)
    }

    /// Strictly inside: both boundaries are excluded.
    pub fn strictly_contains(&self, instant: DateTime<Utc>) -> bool {
        self.start < instant && instant < self.end
    }
}

/// Parse an IANA timezone name.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse()
        .map_err(|_| EngineError::InvalidTimezone(name.to_string()))
}
