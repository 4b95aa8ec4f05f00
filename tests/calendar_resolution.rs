use async_trait::async_trait;
use chrono::NaiveDate;
use chrono_tz::Tz;
use std::sync::atomic::{AtomicUsize, Ordering};

use daily_digest::components::calendar::fallback::RemoteCalendar;
use daily_digest::components::calendar::models::{EventEntry, Window};
use daily_digest::components::calendar::resolve::{CalendarResolver, FeedError, FeedSource};
use daily_digest::error::DigestResult;
use daily_digest::utils::time::day_window;

fn sao_paulo() -> Tz {
    "America/Sao_Paulo".parse().unwrap()
}

fn window_for(date: (i32, u32, u32), tz: Tz) -> Window {
    day_window(NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(), tz)
}

/// Fallback client returning a fixed result and counting calls
struct StaticRemote {
    entries: Vec<EventEntry>,
    calls: AtomicUsize,
}

impl StaticRemote {
    fn new(entries: Vec<EventEntry>) -> Self {
        Self {
            entries,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RemoteCalendar for StaticRemote {
    async fn list_events(&self, _window: &Window) -> DigestResult<Vec<EventEntry>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.entries.clone())
    }
}

fn remote_entry(title: &str) -> EventEntry {
    EventEntry {
        title: title.to_string(),
        start: "2025-09-19T09:00:00-03:00".to_string(),
        end: "2025-09-19T10:00:00-03:00".to_string(),
    }
}

const STANDUP_FEED: &[u8] = b"BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//test//EN\r\n\
BEGIN:VEVENT\r\n\
UID:standup@example.com\r\n\
DTSTART:20250919T140000Z\r\n\
DTEND:20250919T150000Z\r\n\
SUMMARY:Standup\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

const RECURRING_FEED: &[u8] = b"BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
BEGIN:VEVENT\r\n\
UID:daily@example.com\r\n\
DTSTART:20250901T090000Z\r\n\
DTEND:20250901T093000Z\r\n\
RRULE:FREQ=DAILY;COUNT=5\r\n\
SUMMARY:Morning sync\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

#[test]
fn single_event_resolves_into_reference_zone() {
    let tz = sao_paulo();
    let resolver = CalendarResolver::new(tz);
    let window = window_for((2025, 9, 19), tz);

    let entries = resolver.resolve_feed(STANDUP_FEED, &window).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].title, "Standup");
    assert_eq!(entries[0].start, "2025-09-19T11:00:00-03:00");
    assert_eq!(entries[0].end, "2025-09-19T12:00:00-03:00");
}

#[test]
fn count_bounded_series_yields_nothing_after_it_ends() {
    let tz = sao_paulo();
    let resolver = CalendarResolver::new(tz);
    let window = Window {
        start: window_for((2025, 9, 19), tz).start,
        end: window_for((2025, 9, 20), tz).end,
    };

    let entries = resolver.resolve_feed(RECURRING_FEED, &window).unwrap();
    assert!(entries.is_empty());
}

#[test]
fn recurring_series_expands_with_invariant_duration() {
    let tz = sao_paulo();
    let resolver = CalendarResolver::new(tz);
    let window = Window {
        start: window_for((2025, 9, 1), tz).start,
        end: window_for((2025, 9, 30), tz).end,
    };

    let entries = resolver.resolve_feed(RECURRING_FEED, &window).unwrap();
    assert_eq!(entries.len(), 5);
    assert_eq!(entries[0].title, "Morning sync");
    assert_eq!(entries[0].start, "2025-09-01T06:00:00-03:00");
    assert_eq!(entries[0].end, "2025-09-01T06:30:00-03:00");
    assert_eq!(entries[4].start, "2025-09-05T06:00:00-03:00");
}

#[test]
fn corrupted_feed_is_repaired_before_parsing() {
    let tz = sao_paulo();
    let resolver = CalendarResolver::new(tz);
    let window = window_for((2025, 9, 19), tz);

    let corrupted = b"BEGIN:VCALENDAR\r\n\
02:GARBAGE\r\n\
BEGIN:VEVENT\r\n\
UID:folded@example.com\r\n\
DTSTART:20250919T140000Z\r\n\
SUMMARY:Split\r\n across\r\n lines\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";
    let entries = resolver.resolve_feed(corrupted, &window).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].title, "Split across lines");
    // No DTEND: defaults to one hour
    assert_eq!(entries[0].end, "2025-09-19T12:00:00-03:00");
}

#[tokio::test]
async fn transport_failure_returns_fallback_verbatim() {
    let tz = sao_paulo();
    let resolver = CalendarResolver::new(tz);
    let window = window_for((2025, 9, 19), tz);
    let remote = StaticRemote::new(vec![remote_entry("Remote A"), remote_entry("Remote B")]);

    let entries = resolver
        .resolve(
            Err(FeedError::Transport("connection refused".to_string())),
            &window,
            Some(&remote),
        )
        .await;

    assert_eq!(remote.calls.load(Ordering::SeqCst), 1);
    assert_eq!(entries, remote.entries);
}

#[tokio::test]
async fn parse_failure_never_mixes_partial_primary_with_fallback() {
    let tz = sao_paulo();
    let resolver = CalendarResolver::new(tz);
    let window = window_for((2025, 9, 19), tz);
    let remote = StaticRemote::new(vec![remote_entry("Remote only")]);

    let entries = resolver
        .resolve(Ok(b"completely broken feed".to_vec()), &window, Some(&remote))
        .await;

    assert_eq!(entries, remote.entries);
}

#[tokio::test]
async fn usable_primary_never_consults_fallback() {
    let tz = sao_paulo();
    let resolver = CalendarResolver::new(tz);
    let window = window_for((2025, 9, 19), tz);
    let remote = StaticRemote::new(vec![remote_entry("Should not appear")]);

    let entries = resolver
        .resolve(Ok(STANDUP_FEED.to_vec()), &window, Some(&remote))
        .await;

    assert_eq!(remote.calls.load(Ordering::SeqCst), 0);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].title, "Standup");
}

#[tokio::test]
async fn no_usable_source_is_an_empty_result() {
    let tz = sao_paulo();
    let resolver = CalendarResolver::new(tz);
    let window = window_for((2025, 9, 19), tz);

    let entries = resolver
        .resolve(Err(FeedError::NotConfigured), &window, None)
        .await;
    assert!(entries.is_empty());
}

#[tokio::test]
async fn feed_can_be_read_from_a_local_file() {
    use daily_digest::components::calendar::resolve::load_feed;

    let path = std::env::temp_dir().join("daily_digest_feed_test.ics");
    std::fs::write(&path, STANDUP_FEED).unwrap();

    let source = FeedSource::from_config(path.to_str().unwrap());
    let raw = load_feed(&reqwest::Client::new(), &source).await.unwrap();
    assert_eq!(raw, STANDUP_FEED);

    std::fs::remove_file(&path).ok();
}
