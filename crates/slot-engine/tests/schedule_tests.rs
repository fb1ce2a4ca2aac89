//! End-to-end tests for the schedule pipeline.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use slot_engine::{
    compute_schedule, EngineError, RawEvent, ScheduleRequest, SourceResult, TopicRegistry,
};

fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

fn berlin() -> Tz {
    "Europe/Berlin".parse().unwrap()
}

/// Monday 2026-06-01, 08:00 in Berlin.
fn request() -> ScheduleRequest {
    ScheduleRequest::new(utc(2026, 6, 1, 6, 0), berlin())
}

/// "Focus Work" 10:00-11:00 Berlin time on Thursday (day 3), plus an evening dinner.
fn primary() -> SourceResult {
    SourceResult::from_events([
        RawEvent::new("focus", "Focus Work", utc(2026, 6, 4, 8, 0), utc(2026, 6, 4, 9, 0)),
        RawEvent::new("dinner", "Dinner", utc(2026, 6, 6, 17, 0), utc(2026, 6, 6, 19, 0)),
    ])
}

/// Private "Standup" 10:30-10:45 Berlin time on the same Thursday.
fn plan() -> SourceResult {
    SourceResult::from_events([RawEvent::new(
        "standup",
        "Standup",
        utc(2026, 6, 4, 8, 30),
        utc(2026, 6, 4, 8, 45),
    )])
}

#[test]
fn focus_work_collides_with_private_standup() {
    let mut request = request();
    request.topics = vec!["work".to_string()];

    let schedule =
        compute_schedule(&primary(), &[plan()], &request, &TopicRegistry::standard()).unwrap();

    assert!(schedule.ready);
    assert_eq!(schedule.occurrences.len(), 1);
    let focus = &schedule.occurrences[0];
    assert_eq!(focus.id, "focus");
    assert_eq!(focus.overlaps.len(), 1);
    assert_eq!(focus.overlaps[0].name, "Standup");
    assert!(focus.overlaps[0].private);
    assert_eq!(focus.overlaps[0].blocks, vec!["Focus Work".to_string()]);

    let thursday = NaiveDate::from_ymd_opt(2026, 6, 4).unwrap();
    assert_eq!(schedule.days.len(), 21);
    assert_eq!(schedule.enabled_days.len(), 1);
    assert_eq!(schedule.enabled_days[0].date, thursday);
    assert_eq!(schedule.enabled_days[0].label, "Thu");
    assert_eq!(schedule.selected_day, Some(thursday));
}

#[test]
fn occurrences_are_sorted_by_start() {
    let primary = SourceResult::from_events([
        RawEvent::new("late", "Late", utc(2026, 6, 10, 9, 0), utc(2026, 6, 10, 10, 0)),
        RawEvent::new("early", "Early", utc(2026, 6, 2, 9, 0), utc(2026, 6, 2, 10, 0)),
        RawEvent::new("weekly", "Weekly", utc(2026, 5, 26, 7, 0), utc(2026, 5, 26, 8, 0))
            .with_rrule("FREQ=WEEKLY"),
    ]);

    let schedule =
        compute_schedule(&primary, &[], &request(), &TopicRegistry::standard()).unwrap();

    let starts: Vec<_> = schedule.occurrences.iter().map(|o| o.date).collect();
    let mut sorted = starts.clone();
    sorted.sort();
    assert_eq!(starts, sorted);
    assert_eq!(schedule.occurrences[0].source_id, "weekly");
    assert_eq!(schedule.occurrences[1].id, "early");
    assert_eq!(schedule.occurrences.len(), 5, "two singles and three Tuesdays");
}

#[test]
fn pending_plan_source_yields_nothing() {
    let schedule = compute_schedule(
        &primary(),
        &[plan(), SourceResult::Pending],
        &request(),
        &TopicRegistry::standard(),
    )
    .unwrap();

    assert!(!schedule.ready);
    assert!(schedule.occurrences.is_empty());
    assert!(schedule.enabled_days.is_empty());
    assert_eq!(schedule.days.len(), 21);
}

#[test]
fn pending_primary_source_yields_nothing() {
    let schedule = compute_schedule(
        &SourceResult::Pending,
        &[plan()],
        &request(),
        &TopicRegistry::standard(),
    )
    .unwrap();

    assert!(!schedule.ready);
    assert!(schedule.occurrences.is_empty());
}

#[test]
fn failed_sources_are_reported() {
    let schedule = compute_schedule(
        &SourceResult::Failed("404 Not Found".to_string()),
        &[plan(), SourceResult::Failed("timeout".to_string())],
        &request(),
        &TopicRegistry::standard(),
    )
    .unwrap();

    assert!(!schedule.ready);
    assert!(schedule.occurrences.is_empty());
    let sources: Vec<(&str, &str)> = schedule
        .source_errors
        .iter()
        .map(|e| (e.source.as_str(), e.message.as_str()))
        .collect();
    assert_eq!(sources, vec![("primary", "404 Not Found"), ("plan 1", "timeout")]);
}

#[test]
fn unknown_topic_is_an_error_even_when_not_ready() {
    let mut request = request();
    request.topics = vec!["brunch".to_string()];

    let err = compute_schedule(&SourceResult::Pending, &[], &request, &TopicRegistry::standard())
        .unwrap_err();

    assert_eq!(err, EngineError::UnknownTopic("brunch".to_string()));
}

#[test]
fn broken_rule_is_reported_and_the_rest_survives() {
    let primary = SourceResult::from_events([
        RawEvent::new("ok", "Fine", utc(2026, 6, 2, 9, 0), utc(2026, 6, 2, 10, 0)),
        RawEvent::new("bad", "Broken", utc(2026, 6, 2, 9, 0), utc(2026, 6, 2, 10, 0))
            .with_rrule("FREQ=FORTNIGHTLY"),
    ]);

    let schedule =
        compute_schedule(&primary, &[], &request(), &TopicRegistry::standard()).unwrap();

    assert!(schedule.ready);
    assert_eq!(schedule.occurrences.len(), 1);
    assert_eq!(schedule.skipped.len(), 1);
    assert_eq!(schedule.skipped[0].uid, "bad");
}

#[test]
fn selected_day_survives_while_enabled() {
    let mut request = request();
    let saturday = NaiveDate::from_ymd_opt(2026, 6, 6).unwrap();
    request.selected_day = Some(saturday);

    let schedule =
        compute_schedule(&primary(), &[plan()], &request, &TopicRegistry::standard()).unwrap();
    assert_eq!(schedule.selected_day, Some(saturday));

    // Filtering Saturday away moves the selection to the first remaining day.
    request.topics = vec!["work".to_string()];
    let schedule =
        compute_schedule(&primary(), &[plan()], &request, &TopicRegistry::standard()).unwrap();
    assert_eq!(schedule.selected_day, NaiveDate::from_ymd_opt(2026, 6, 4));
}

#[test]
fn recomputation_is_idempotent() {
    let plans = [plan(), SourceResult::Ready(Default::default())];

    let first = compute_schedule(&primary(), &plans, &request(), &TopicRegistry::standard()).unwrap();
    let second = compute_schedule(&primary(), &plans, &request(), &TopicRegistry::standard()).unwrap();

    assert_eq!(first, second);
}

#[test]
fn plan_events_only_annotate_and_never_show_up_themselves() {
    let schedule =
        compute_schedule(&primary(), &[plan()], &request(), &TopicRegistry::standard()).unwrap();

    assert!(schedule.occurrences.iter().all(|o| o.source_id != "standup"));
    let dinner = schedule.occurrences.iter().find(|o| o.id == "dinner").unwrap();
    assert!(dinner.overlaps.is_empty());
    assert_eq!(dinner.end_date - dinner.date, Duration::hours(2));
}

#[test]
fn schedule_serializes_with_viewer_offsets() {
    let schedule =
        compute_schedule(&primary(), &[plan()], &request(), &TopicRegistry::standard()).unwrap();

    let json = serde_json::to_value(&schedule).unwrap();

    let focus = json["occurrences"]
        .as_array()
        .unwrap()
        .iter()
        .find(|o| o["id"] == "focus")
        .unwrap();
    assert_eq!(focus["date"], "2026-06-04T10:00:00+02:00");
    assert_eq!(focus["end_date"], "2026-06-04T11:00:00+02:00");
    assert_eq!(focus["overlaps"][0]["private"], true);
    assert_eq!(json["selected_day"], "2026-06-04");
    assert_eq!(json["ready"], true);
}

#[test]
fn oversized_horizon_is_an_invalid_window() {
    let mut req = request();
    req.horizon_weeks = u32::MAX;

    let result = compute_schedule(&primary(), &[plan()], &req, &TopicRegistry::standard());

    assert!(matches!(result, Err(EngineError::InvalidWindow(_))));
}
