use chrono::TimeZone;
use chrono_tz::Tz;
use icalendar::{Calendar, CalendarDateTime, Component, DatePerhapsTime};
use tracing::debug;

use super::models::{EventStamp, ParsedEvent, RecurrenceRule};
use super::resolve::FeedError;
use crate::config::UNTITLED_EVENT;

/// Turn sanitized logical lines into structured event records.
///
/// Grammar-level decoding is delegated to the `icalendar` crate; this
/// adapter only extracts SUMMARY/DTSTART/DTEND/RRULE, defaults the title,
/// and skips components without a start. Zero input lines are an empty
/// component set, not an error.
pub fn parse(lines: &[Vec<u8>]) -> Result<Vec<ParsedEvent>, FeedError> {
    if lines.is_empty() {
        return Ok(Vec::new());
    }

    let text = String::from_utf8_lossy(&lines.join(&b'\n')).into_owned();
    let calendar: Calendar = text
        .parse()
        .map_err(|e: String| FeedError::Parse(e))?;

    let mut events = Vec::new();
    for component in &calendar.components {
        let Some(event) = component.as_event() else {
            continue;
        };
        let Some(start) = event.get_start().map(stamp_from) else {
            debug!("skipping VEVENT without DTSTART");
            continue;
        };
        let title = event
            .get_summary()
            .filter(|s| !s.is_empty())
            .unwrap_or(UNTITLED_EVENT)
            .to_string();

        events.push(ParsedEvent {
            title,
            start,
            end: event.get_end().map(stamp_from),
            rule: event.property_value("RRULE").map(RecurrenceRule::parse),
        });
    }
    Ok(events)
}

/// Collapse the icalendar date/datetime forms into the three-way stamp the
/// normalizer understands. TZIDs that are not IANA names degrade to a
/// floating value rather than guessing a zone.
fn stamp_from(value: DatePerhapsTime) -> EventStamp {
    match value {
        DatePerhapsTime::Date(date) => EventStamp::Date(date),
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive)) => {
            EventStamp::Floating(naive)
        }
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(utc)) => {
            EventStamp::Zoned(utc.fixed_offset())
        }
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => {
            match tzid.parse::<Tz>() {
                Ok(tz) => match tz.from_local_datetime(&date_time).earliest() {
                    Some(zoned) => EventStamp::Zoned(zoned.fixed_offset()),
                    None => EventStamp::Floating(date_time),
                },
                Err(_) => {
                    debug!(%tzid, "unknown TZID, treating datetime as floating");
                    EventStamp::Floating(date_time)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::sanitize::sanitize;
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn parse_feed(raw: &[u8]) -> Vec<ParsedEvent> {
        parse(&sanitize(raw)).expect("feed should parse")
    }

    const FEED: &[u8] = b"BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
BEGIN:VEVENT\r\n\
UID:1\r\n\
DTSTART:20250919T140000Z\r\n\
DTEND:20250919T150000Z\r\n\
SUMMARY:Standup\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:2\r\n\
SUMMARY:No start\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:3\r\n\
DTSTART;VALUE=DATE:20250920\r\n\
RRULE:FREQ=WEEKLY;X-JUNK=1\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    #[test]
    fn extracts_events_and_skips_missing_start() {
        let events = parse_feed(FEED);
        assert_eq!(events.len(), 2);

        assert_eq!(events[0].title, "Standup");
        let expected = Utc.with_ymd_and_hms(2025, 9, 19, 14, 0, 0).unwrap();
        assert_eq!(events[0].start, EventStamp::Zoned(expected.fixed_offset()));
        assert!(events[0].end.is_some());
        assert!(events[0].rule.is_none());
    }

    #[test]
    fn defaults_title_and_keeps_filtered_rule() {
        let events = parse_feed(FEED);
        assert_eq!(events[1].title, UNTITLED_EVENT);
        assert_eq!(
            events[1].start,
            EventStamp::Date(NaiveDate::from_ymd_opt(2025, 9, 20).unwrap())
        );
        let rule = events[1].rule.as_ref().unwrap();
        assert_eq!(rule.to_rule_string(), "FREQ=WEEKLY");
    }

    #[test]
    fn zero_lines_yield_empty_component_set() {
        assert!(parse(&[]).unwrap().is_empty());
    }

    #[test]
    fn garbage_text_is_a_parse_error() {
        let lines = sanitize(b"this is not a calendar at all");
        assert!(matches!(parse(&lines), Err(FeedError::Parse(_))));
    }

    #[test]
    fn sanitizer_repairs_feed_the_grammar_would_reject() {
        let corrupted = b"BEGIN:VCALENDAR\r\n\
BEGIN:VEVENT\r\n\
UID:4\r\n\
DTSTART:20250919T140000Z\r\n\
02:SOMEVALUE\r\n\
SUMMARY:Survives corr\r\n uption\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";
        let events = parse_feed(corrupted);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Survives corruption");
    }
}
