//! Adapts iCalendar text into [`RawEvent`] records.
//!
//! Every top-level component carrying a `DTSTART` becomes a record; the
//! engine decides later which kinds are schedulable. Components with a
//! `RECURRENCE-ID` are folded into their master's `recurrences` map. A timed
//! component without `DTEND` ends at its start; the engine drops such
//! zero-length records.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use icalendar::parser::{read_calendar, unfold, Component};
use icalendar::{CalendarDateTime, DatePerhapsTime};
use slot_engine::{ComponentKind, RawEvent, RecurrenceOverride};
use tracing::{debug, warn};

/// One parsed component plus the instant it replaces, if it is an override.
struct Record {
    event: RawEvent,
    recurrence_id: Option<DateTime<Utc>>,
}

/// Parse a whole calendar file.
///
/// Floating and all-day times are read in `tz`; `TZID` parameters naming an
/// IANA zone are honoured, unknown ones fall back to `tz`.
pub fn parse_events(content: &str, tz: &Tz) -> Result<Vec<RawEvent>> {
    let unfolded = unfold(content);
    let calendar =
        read_calendar(&unfolded).map_err(|e| anyhow!("invalid iCalendar data: {}", e))?;

    let mut masters: Vec<RawEvent> = Vec::new();
    let mut overrides: Vec<(DateTime<Utc>, RawEvent)> = Vec::new();
    for component in &calendar.components {
        let Some(record) = read_component(component, tz) else {
            continue;
        };
        match record.recurrence_id {
            Some(id) => overrides.push((id, record.event)),
            None => masters.push(record.event),
        }
    }

    for (id, replacement) in overrides {
        match masters.iter_mut().find(|m| m.uid == replacement.uid) {
            Some(master) => {
                master.recurrences.insert(
                    id,
                    RecurrenceOverride {
                        start: replacement.start,
                        end: replacement.end,
                    },
                );
            }
            None => {
                // No master in this file: keep the instance as a one-off.
                debug!(uid = %replacement.uid, "override without master");
                let mut orphan = replacement;
                orphan.uid = format!("{}@{}", orphan.uid, id.to_rfc3339());
                masters.push(orphan);
            }
        }
    }

    Ok(masters)
}

fn read_component(component: &Component, tz: &Tz) -> Option<Record> {
    let name: &str = component.name.as_ref();
    let dtstart = component.find_prop("DTSTART")?;
    let Some(uid) = component.find_prop("UID").map(|p| p.val.to_string()) else {
        warn!(component = name, "skipping component without UID");
        return None;
    };
    let Some((start, all_day)) = DatePerhapsTime::try_from(dtstart)
        .ok()
        .and_then(|t| to_utc(t, tz))
    else {
        warn!(uid = %uid, "skipping component with unreadable DTSTART");
        return None;
    };

    let end = component
        .find_prop("DTEND")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
        .and_then(|t| to_utc(t, tz))
        .map(|(end, _)| end)
        .unwrap_or_else(|| {
            if all_day {
                start + Duration::days(1)
            } else {
                start
            }
        });

    let summary = component
        .find_prop("SUMMARY")
        .map(|p| p.val.to_string())
        .unwrap_or_default();

    let mut event = RawEvent::new(uid, summary, start, end)
        .with_kind(ComponentKind::from_component_name(name));
    event.rrule = component.find_prop("RRULE").map(|p| p.val.to_string());
    event.transparency = component.find_prop("TRANSP").map(|p| p.val.to_string());

    let recurrence_id = component
        .find_prop("RECURRENCE-ID")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
        .and_then(|t| to_utc(t, tz))
        .map(|(id, _)| id);

    Some(Record {
        event,
        recurrence_id,
    })
}

/// Resolve a property value to an instant; the flag is true for all-day dates.
fn to_utc(value: DatePerhapsTime, tz: &Tz) -> Option<(DateTime<Utc>, bool)> {
    match value {
        DatePerhapsTime::Date(date) => Some((local_to_utc(date.and_time(NaiveTime::MIN), tz)?, true)),
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt)) => Some((dt, false)),
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive)) => {
            Some((local_to_utc(naive, tz)?, false))
        }
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => {
            let zone = tzid.parse::<Tz>().unwrap_or_else(|_| {
                debug!(tzid = %tzid, "unknown TZID, using viewer zone");
                *tz
            });
            Some((local_to_utc(date_time, &zone)?, false))
        }
    }
}

/// Earliest mapping of a local wall time; times inside a spring-forward gap are
/// moved one hour ahead.
fn local_to_utc(naive: NaiveDateTime, tz: &Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn calendar(body: &str) -> String {
        format!(
            "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//test//EN\r\n{}END:VCALENDAR\r\n",
            body
        )
    }

    #[test]
    fn reads_a_utc_event() {
        let ics = calendar(
            "BEGIN:VEVENT\r\nUID:a\r\nSUMMARY:Focus Work\r\n\
             DTSTART:20260604T080000Z\r\nDTEND:20260604T090000Z\r\nEND:VEVENT\r\n",
        );

        let events = parse_events(&ics, &Tz::UTC).unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].uid, "a");
        assert_eq!(events[0].summary, "Focus Work");
        assert_eq!(events[0].start, utc(2026, 6, 4, 8, 0));
        assert_eq!(events[0].end, utc(2026, 6, 4, 9, 0));
        assert_eq!(events[0].transparency, None);
        assert_eq!(events[0].kind, ComponentKind::Event);
    }

    #[test]
    fn tzid_and_floating_times() {
        let ics = calendar(
            "BEGIN:VEVENT\r\nUID:zoned\r\n\
             DTSTART;TZID=America/New_York:20260604T090000\r\n\
             DTEND;TZID=America/New_York:20260604T100000\r\nEND:VEVENT\r\n\
             BEGIN:VEVENT\r\nUID:floating\r\n\
             DTSTART:20260604T090000\r\nDTEND:20260604T100000\r\nEND:VEVENT\r\n",
        );

        let events = parse_events(&ics, &chrono_tz::Europe::Berlin).unwrap();
        let zoned = events.iter().find(|e| e.uid == "zoned").unwrap();
        let floating = events.iter().find(|e| e.uid == "floating").unwrap();

        assert_eq!(zoned.start, utc(2026, 6, 4, 13, 0));
        assert_eq!(floating.start, utc(2026, 6, 4, 7, 0));
    }

    #[test]
    fn all_day_without_end_lasts_one_day() {
        let ics = calendar(
            "BEGIN:VEVENT\r\nUID:off\r\nSUMMARY:OOO\r\n\
             DTSTART;VALUE=DATE:20260605\r\nEND:VEVENT\r\n",
        );

        let events = parse_events(&ics, &Tz::UTC).unwrap();

        assert_eq!(events[0].start, utc(2026, 6, 5, 0, 0));
        assert_eq!(events[0].end, utc(2026, 6, 6, 0, 0));
    }

    #[test]
    fn rrule_and_transp_are_kept() {
        let ics = calendar(
            "BEGIN:VEVENT\r\nUID:yoga\r\nSUMMARY:Yoga\r\nTRANSP:TRANSPARENT\r\n\
             RRULE:FREQ=WEEKLY;BYDAY=MO\r\n\
             DTSTART:20260601T170000Z\r\nDTEND:20260601T180000Z\r\nEND:VEVENT\r\n",
        );

        let events = parse_events(&ics, &Tz::UTC).unwrap();

        assert_eq!(events[0].rrule.as_deref(), Some("FREQ=WEEKLY;BYDAY=MO"));
        assert_eq!(events[0].transparency.as_deref(), Some("TRANSPARENT"));
    }

    #[test]
    fn recurrence_id_folds_into_master() {
        let ics = calendar(
            "BEGIN:VEVENT\r\nUID:yoga\r\nSUMMARY:Yoga\r\nRRULE:FREQ=WEEKLY\r\n\
             DTSTART:20260601T170000Z\r\nDTEND:20260601T180000Z\r\nEND:VEVENT\r\n\
             BEGIN:VEVENT\r\nUID:yoga\r\nSUMMARY:Yoga (moved)\r\n\
             RECURRENCE-ID:20260608T170000Z\r\n\
             DTSTART:20260609T170000Z\r\nDTEND:20260609T180000Z\r\nEND:VEVENT\r\n",
        );

        let events = parse_events(&ics, &Tz::UTC).unwrap();

        assert_eq!(events.len(), 1);
        let moved = &events[0].recurrences[&utc(2026, 6, 8, 17, 0)];
        assert_eq!(moved.start, utc(2026, 6, 9, 17, 0));
        assert_eq!(moved.end, utc(2026, 6, 9, 18, 0));
    }

    #[test]
    fn other_components_keep_their_kind() {
        let ics = calendar(
            "BEGIN:VTODO\r\nUID:t\r\nSUMMARY:Taxes\r\nDTSTART:20260604T080000Z\r\nEND:VTODO\r\n",
        );

        let events = parse_events(&ics, &Tz::UTC).unwrap();

        assert_eq!(events[0].kind, ComponentKind::Todo);
        assert_eq!(events[0].end, events[0].start);
    }

    #[test]
    fn components_without_dtstart_or_uid_are_ignored() {
        let ics = calendar(
            "BEGIN:VEVENT\r\nSUMMARY:No uid\r\nDTSTART:20260604T080000Z\r\nEND:VEVENT\r\n\
             BEGIN:VEVENT\r\nUID:nostart\r\nSUMMARY:No start\r\nEND:VEVENT\r\n",
        );

        assert!(parse_events(&ics, &Tz::UTC).unwrap().is_empty());
    }
}
