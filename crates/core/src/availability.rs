//! Availability window resolution.
//!
//! Pure functions over a [`MonitoredPerson`] and a zone-local instant. Saturday
//! and Sunday are always unavailable regardless of the declared windows.

use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone,
    Timelike, Utc, Weekday,
};
use chrono_tz::Tz;

use crate::error::CoreError;
use crate::roster::MonitoredPerson;

/// Convert a UTC instant into the reference zone.
pub fn local_time(tz: Tz, at: DateTime<Utc>) -> DateTime<Tz> {
    at.with_timezone(&tz)
}

pub fn is_weekend(day: Weekday) -> bool {
    matches!(day, Weekday::Sat | Weekday::Sun)
}

pub fn minute_of_day<T: Timelike>(t: &T) -> u16 {
    (t.hour() * 60 + t.minute()) as u16
}

fn require_windows(person: &MonitoredPerson) -> Result<(), CoreError> {
    if person.windows.is_empty() {
        return Err(CoreError::Configuration(format!(
            "person '{}' has no availability windows",
            person.key
        )));
    }
    Ok(())
}

/// Whether `person` is reachable at `now`.
///
/// Errors when the person declares no windows instead of guessing.
pub fn is_available(person: &MonitoredPerson, now: &DateTime<Tz>) -> Result<bool, CoreError> {
    require_windows(person)?;

    if is_weekend(now.weekday()) {
        return Ok(false);
    }

    let minute = minute_of_day(now);
    Ok(person.windows.iter().any(|w| w.contains(minute)))
}

/// The next instant at which `person` becomes available, starting from `from`.
///
/// Returns `from` itself when the person is already available; callers should
/// check [`is_available`] first.
pub fn next_available(
    person: &MonitoredPerson,
    from: &DateTime<Tz>,
) -> Result<DateTime<Tz>, CoreError> {
    if is_available(person, from)? {
        return Ok(*from);
    }

    let tz = from.timezone();
    let today = from.date_naive();

    if !is_weekend(today.weekday()) {
        let minute = minute_of_day(from);
        let later_today = person
            .windows
            .iter()
            .map(|w| w.start_minute())
            .filter(|start| *start > minute)
            .min();
        if let Some(start) = later_today {
            return Ok(at_minute(tz, today, start));
        }
    }

    let earliest = person.earliest_start().ok_or_else(|| {
        CoreError::Configuration(format!("person '{}' has no availability windows", person.key))
    })?;

    let mut day = today;
    for _ in 0..7 {
        day = day
            .succ_opt()
            .ok_or_else(|| CoreError::Other(format!("date overflow after {day}")))?;
        if !is_weekend(day.weekday()) {
            return Ok(at_minute(tz, day, earliest));
        }
    }

    Err(CoreError::Other(format!(
        "no weekday found within a week of {today}"
    )))
}

/// Human phrase for when `next` happens, relative to `from`.
///
/// Same calendar day reads "later today at 10:00 EDT"; anything else reads
/// "on Wednesday at 10:00 EDT".
pub fn describe_next_available(from: &DateTime<Tz>, next: &DateTime<Tz>) -> String {
    let clock = next.format("%H:%M %Z");
    if next.date_naive() == from.date_naive() {
        if next <= from {
            "right now".to_string()
        } else {
            format!("later today at {clock}")
        }
    } else {
        format!("on {} at {clock}", next.format("%A"))
    }
}

/// Build the local instant for `minute` on `date`, skipping over DST gaps.
fn at_minute(tz: Tz, date: NaiveDate, minute: u16) -> DateTime<Tz> {
    let naive = date.and_time(NaiveTime::MIN) + Duration::minutes(i64::from(minute));
    localize(tz, naive)
}

fn localize(tz: Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    let mut candidate = naive;
    // Gaps are at most a couple of hours in every IANA zone.
    for _ in 0..(4 * 24) {
        match tz.from_local_datetime(&candidate) {
            LocalResult::Single(t) => return t,
            LocalResult::Ambiguous(earliest, _) => return earliest,
            LocalResult::None => candidate += Duration::minutes(15),
        }
    }
    tz.from_utc_datetime(&naive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::AvailabilityWindow;
    use chrono_tz::America::New_York;

    fn person(windows: &[(u16, u16)]) -> MonitoredPerson {
        MonitoredPerson::new(
            "coach",
            "Coach",
            "42",
            windows
                .iter()
                .map(|(s, e)| AvailabilityWindow::new(*s, *e).unwrap())
                .collect(),
        )
    }

    /// 2025-06-10 is a Tuesday.
    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Tz> {
        New_York
            .with_ymd_and_hms(2025, 6, day, hour, minute, 0)
            .single()
            .unwrap()
    }

    #[test]
    fn weekend_is_never_available() {
        let p = person(&[(0, 1440)]);
        // 2025-06-14 Saturday, 2025-06-15 Sunday
        for day in [14, 15] {
            for hour in [0, 9, 12, 23] {
                assert!(!is_available(&p, &at(day, hour, 0)).unwrap());
            }
        }
    }

    #[test]
    fn weekday_window_boundaries() {
        let p = person(&[(540, 900)]);
        assert!(is_available(&p, &at(10, 9, 0)).unwrap());
        assert!(is_available(&p, &at(10, 14, 59)).unwrap());
        assert!(!is_available(&p, &at(10, 8, 59)).unwrap());
        assert!(!is_available(&p, &at(10, 15, 0)).unwrap());
    }

    #[test]
    fn inverted_window_does_not_wrap_into_next_day() {
        let p = person(&[(1320, 60)]);
        assert!(is_available(&p, &at(10, 23, 30)).unwrap());
        assert!(!is_available(&p, &at(11, 0, 30)).unwrap());
    }

    #[test]
    fn split_overnight_declaration() {
        let p = person(&[(1200, 1440), (0, 60)]);
        assert!(is_available(&p, &at(10, 23, 59)).unwrap());
        assert!(is_available(&p, &at(11, 0, 30)).unwrap());
        assert!(!is_available(&p, &at(11, 1, 0)).unwrap());
    }

    #[test]
    fn no_windows_is_an_error() {
        let p = person(&[]);
        assert!(matches!(
            is_available(&p, &at(10, 9, 0)),
            Err(CoreError::Configuration(_))
        ));
        assert!(next_available(&p, &at(10, 9, 0)).is_err());
    }

    #[test]
    fn next_available_same_day() {
        let p = person(&[(540, 900)]);
        let next = next_available(&p, &at(10, 8, 0)).unwrap();
        assert_eq!(next, at(10, 9, 0));
    }

    #[test]
    fn next_available_picks_nearest_later_window() {
        let p = person(&[(1080, 1200), (540, 720)]);
        let next = next_available(&p, &at(10, 13, 0)).unwrap();
        assert_eq!(next, at(10, 18, 0));
    }

    #[test]
    fn next_available_rolls_over_weekend() {
        let p = person(&[(540, 900)]);
        // Friday 2025-06-13 16:00 -> Monday 2025-06-16 09:00
        let next = next_available(&p, &at(13, 16, 0)).unwrap();
        assert_eq!(next, at(16, 9, 0));
        assert_eq!(next.weekday(), Weekday::Mon);
    }

    #[test]
    fn next_available_from_weekend_morning() {
        let p = person(&[(540, 900)]);
        // Saturday 08:00 must not report Saturday 09:00
        let next = next_available(&p, &at(14, 8, 0)).unwrap();
        assert_eq!(next, at(16, 9, 0));
    }

    #[test]
    fn next_available_when_available_returns_now() {
        let p = person(&[(540, 900)]);
        let now = at(10, 10, 0);
        assert_eq!(next_available(&p, &now).unwrap(), now);
    }

    #[test]
    fn describe_same_day_and_other_day() {
        let p = person(&[(600, 900)]);

        let morning = at(10, 8, 0);
        let next = next_available(&p, &morning).unwrap();
        let text = describe_next_available(&morning, &next);
        assert!(text.starts_with("later today at 10:00"), "{text}");

        let evening = at(10, 16, 0);
        let next = next_available(&p, &evening).unwrap();
        let text = describe_next_available(&evening, &next);
        assert!(text.contains("Wednesday"), "{text}");
        assert!(text.contains("10:"), "{text}");
    }

    #[test]
    fn local_time_converts_zone() {
        let utc = Utc.with_ymd_and_hms(2025, 6, 10, 14, 0, 0).unwrap();
        let local = local_time(New_York, utc);
        assert_eq!(local.hour(), 10);
    }

    #[test]
    fn dst_gap_moves_forward() {
        // 2025-03-10 is a Monday; 2025-03-09 02:00-03:00 does not exist in New York,
        // so use a window starting inside the gap and roll from the Sunday.
        let p = person(&[(150, 600)]);
        let sunday = New_York.with_ymd_and_hms(2025, 3, 8, 12, 0, 0).single().unwrap();
        let next = next_available(&p, &sunday).unwrap();
        assert_eq!(next.date_naive(), NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
        assert_eq!(minute_of_day(&next), 150);

        let naive = NaiveDate::from_ymd_opt(2025, 3, 9)
            .unwrap()
            .and_hms_opt(2, 30, 0)
            .unwrap();
        let shifted = localize(New_York, naive);
        assert_eq!(shifted.hour(), 3);
    }
}
