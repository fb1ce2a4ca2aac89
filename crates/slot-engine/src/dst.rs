//! Correction for recurrence instants anchored to UTC instead of local time.
//!
//! A rule whose text carries no TZID is evaluated on UTC calendar days. For a
//! viewer far enough from UTC this moves an instance onto the neighbouring local
//! day (a Monday 18:00 PST event expands to Sunday 18:00). The correction
//! shifts the raw instant by the local UTC offset; if that lands on another local
//! day, the raw instant is moved one local day in the same direction.

use chrono::{DateTime, Duration, LocalResult, Offset, TimeZone, Utc};
use chrono_tz::Tz;

/// Minutes to add to local time to obtain UTC at `instant` (positive west of UTC).
pub fn utc_offset_minutes(instant: DateTime<Utc>, tz: &Tz) -> i64 {
    let east_seconds = tz
        .offset_from_utc_datetime(&instant.naive_utc())
        .fix()
        .local_minus_utc();
    -(east_seconds as i64) / 60
}

/// Correct one raw recurrence instant onto the intended local calendar day.
pub fn correct_utc_anchor(raw: DateTime<Utc>, tz: &Tz) -> DateTime<Tz> {
    let local = raw.with_timezone(tz);
    let shifted = (raw + Duration::minutes(utc_offset_minutes(raw, tz))).with_timezone(tz);

    if shifted.date_naive() == local.date_naive() {
        return local;
    }

    let days = if shifted > local { 1 } else { -1 };
    shift_local_days(&local, days)
}

/// Move `date` by whole local calendar days, keeping the wall-clock time.
///
/// A wall time that does not exist on the target day (spring-forward gap) falls
/// back to a plain 24-hour shift; an ambiguous one takes the earlier instant.
pub fn shift_local_days(date: &DateTime<Tz>, days: i64) -> DateTime<Tz> {
    let target = date.naive_local() + Duration::days(days);
    match date.timezone().from_local_datetime(&target) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => *date + Duration::days(days),
    }
}
