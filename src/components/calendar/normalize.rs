use chrono::{DateTime, LocalResult, NaiveTime, TimeZone};
use chrono_tz::Tz;

use super::models::EventStamp;

/// Normalize a feed timestamp into the reference zone.
///
/// Date-only values become midnight on that date in the reference zone,
/// floating values are interpreted as UTC, and zoned values convert
/// directly. Every start and end goes through this exact branch, single
/// and recurring events alike, so naive and zone-aware instants are never
/// compared.
pub fn normalize(stamp: EventStamp, tz: Tz) -> DateTime<Tz> {
    match stamp {
        EventStamp::Date(date) => {
            let midnight = date.and_time(NaiveTime::MIN);
            match tz.from_local_datetime(&midnight) {
                LocalResult::Single(dt) => dt,
                LocalResult::Ambiguous(earliest, _) => earliest,
                // Midnight fell into a DST gap; read it as UTC instead
                LocalResult::None => midnight.and_utc().with_timezone(&tz),
            }
        }
        EventStamp::Floating(naive) => naive.and_utc().with_timezone(&tz),
        EventStamp::Zoned(zoned) => zoned.with_timezone(&tz),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn zone(name: &str) -> Tz {
        name.parse().unwrap()
    }

    #[test]
    fn date_becomes_local_midnight() {
        let tz = zone("America/Sao_Paulo");
        let date = NaiveDate::from_ymd_opt(2025, 9, 19).unwrap();
        let normalized = normalize(EventStamp::Date(date), tz);
        assert_eq!(normalized, tz.with_ymd_and_hms(2025, 9, 19, 0, 0, 0).unwrap());
    }

    #[test]
    fn floating_is_read_as_utc() {
        let tz = zone("America/Sao_Paulo");
        let naive = NaiveDate::from_ymd_opt(2025, 9, 19)
            .unwrap()
            .and_hms_opt(14, 0, 0)
            .unwrap();
        let normalized = normalize(EventStamp::Floating(naive), tz);
        // 14:00 UTC is 11:00 in Sao Paulo
        assert_eq!(normalized, tz.with_ymd_and_hms(2025, 9, 19, 11, 0, 0).unwrap());
    }

    #[test]
    fn zoned_converts_without_reinterpretation() {
        let tz = zone("America/Sao_Paulo");
        let utc = Utc.with_ymd_and_hms(2025, 9, 19, 14, 0, 0).unwrap();
        let normalized = normalize(EventStamp::Zoned(utc.fixed_offset()), tz);
        assert_eq!(normalized, utc.with_timezone(&tz));
        assert_eq!(normalized.to_rfc3339(), "2025-09-19T11:00:00-03:00");
    }

    #[test]
    fn date_matches_midnight_datetime_in_utc() {
        // In a UTC reference zone the date branch and the floating branch
        // must agree for midnight of the same day
        let tz = chrono_tz::UTC;
        let date = NaiveDate::from_ymd_opt(2025, 9, 19).unwrap();
        let combined = date.and_time(NaiveTime::MIN);
        assert_eq!(
            normalize(EventStamp::Date(date), tz),
            normalize(EventStamp::Floating(combined), tz)
        );
    }
}
