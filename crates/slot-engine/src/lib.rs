//! # slot-engine
//!
//! Occurrence expansion and overlap detection behind a personal "schedule with me"
//! page.
//!
//! A primary calendar and any number of plan calendars are expanded into concrete
//! occurrences inside a bounded horizon. Each primary occurrence is annotated with
//! the plan blocks it collides with, then narrowed by viewer topics, and the days
//! that still have something on them are derived for the day picker.
//!
//! ## Modules
//!
//! - [`model`] — raw records, occurrences, overlap records, windows
//! - [`expander`] — RRULE and one-off expansion for the primary calendar
//! - [`dst`] — correction for rules expanded on UTC days
//! - [`plan`] — plan calendar eligibility and exception expansion
//! - [`overlap`] — primary × plan interval intersection
//! - [`topics`] — injectable topic predicates
//! - [`days`] — horizon day strip, enabled days, default day
//! - [`schedule`] — the full pipeline
//! - [`error`] — Error types

pub mod days;
pub mod dst;
pub mod error;
pub mod expander;
pub mod model;
pub mod overlap;
pub mod plan;
pub mod schedule;
pub mod topics;

pub use days::{build_days, enabled_days, select_day, DayDescriptor};
pub use error::EngineError;
pub use expander::{expand, Expansion, SkippedEvent};
pub use model::{
    ComponentKind, Occurrence, OverlapRecord, RawEvent, RecurrenceOverride, Window,
    MAX_HORIZON_WEEKS,
};
pub use overlap::annotate;
pub use plan::{expand_plan, expand_plans};
pub use schedule::{compute_schedule, Schedule, ScheduleRequest, SourceResult};
pub use topics::TopicRegistry;
