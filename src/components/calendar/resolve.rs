use chrono::Duration;
use chrono_tz::Tz;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, warn};

use super::expand::expand;
use super::fallback::RemoteCalendar;
use super::models::{EventEntry, Occurrence, ParsedEvent, Window};
use super::normalize::normalize;
use super::parse::parse;
use super::sanitize::sanitize;

/// Why the primary ICS feed could not be used.
///
/// Each condition that should push resolution to the fallback client gets
/// its own variant; there is deliberately no catch-all.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed fetch failed: {0}")]
    Transport(String),
    #[error("feed returned HTTP {0}")]
    Status(u16),
    #[error("unexpected feed content type: {0}")]
    ContentType(String),
    #[error("feed could not be read: {0}")]
    Io(String),
    #[error("calendar parse failed: {0}")]
    Parse(String),
    #[error("no calendar feed configured")]
    NotConfigured,
}

/// Where the raw feed bytes come from
#[derive(Debug, Clone)]
pub enum FeedSource {
    Url(String),
    File(String),
}

impl FeedSource {
    /// Classify the configured value as a URL or a local path
    pub fn from_config(value: &str) -> Self {
        if value.starts_with("http://") || value.starts_with("https://") {
            FeedSource::Url(value.to_string())
        } else {
            FeedSource::File(value.to_string())
        }
    }
}

/// Fetch the raw feed, classifying every failure mode as a `FeedError`
pub async fn load_feed(client: &Client, source: &FeedSource) -> Result<Vec<u8>, FeedError> {
    match source {
        FeedSource::Url(url) => {
            let response = client
                .get(url)
                .send()
                .await
                .map_err(|e| FeedError::Transport(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(FeedError::Status(status.as_u16()));
            }

            // Advisory check only: servers that return HTML error pages with
            // a 200 would otherwise reach the parser
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            if !content_type.to_lowercase().contains("text/calendar") {
                return Err(FeedError::ContentType(content_type));
            }

            let bytes = response
                .bytes()
                .await
                .map_err(|e| FeedError::Transport(e.to_string()))?;
            Ok(bytes.to_vec())
        }
        FeedSource::File(path) => tokio::fs::read(path)
            .await
            .map_err(|e| FeedError::Io(e.to_string())),
    }
}

/// Resolves calendar events for a window: sanitize, parse, normalize,
/// expand, filter, sort. Stateless; the reference zone is fixed at
/// construction.
#[derive(Debug, Clone, Copy)]
pub struct CalendarResolver {
    tz: Tz,
}

impl CalendarResolver {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Run the full pipeline over raw feed bytes.
    ///
    /// A feed that sanitizes down to nothing is an empty component set and
    /// resolves to zero events; only grammar-level rejection is an error.
    pub fn resolve_feed(&self, raw: &[u8], window: &Window) -> Result<Vec<EventEntry>, FeedError> {
        let lines = sanitize(raw);
        let events = parse(&lines)?;
        Ok(self.collect(&events, window))
    }

    /// Normalize, expand and window-filter parsed components, sorted
    /// ascending by start with feed order breaking ties
    fn collect(&self, events: &[ParsedEvent], window: &Window) -> Vec<EventEntry> {
        let mut occurrences: Vec<Occurrence> = Vec::new();

        for event in events {
            let start = normalize(event.start, self.tz);
            let end = match event.end {
                Some(stamp) => normalize(stamp, self.tz),
                None => start + Duration::hours(1),
            };

            match &event.rule {
                Some(rule) => {
                    occurrences.extend(expand(&event.title, start, end, rule, window, self.tz));
                }
                None => {
                    if start <= window.end && end >= window.start {
                        occurrences.push(Occurrence {
                            title: event.title.clone(),
                            start,
                            end,
                        });
                    }
                }
            }
        }

        occurrences.sort_by(|a, b| a.start.cmp(&b.start));
        occurrences.iter().map(Occurrence::to_entry).collect()
    }

    /// Resolve from the primary feed, or from the fallback client when the
    /// primary is unusable. The two sources are never merged: it is
    /// primary-or-fallback, and no usable source at all is an empty result,
    /// not a failure.
    pub async fn resolve(
        &self,
        feed: Result<Vec<u8>, FeedError>,
        window: &Window,
        fallback: Option<&dyn RemoteCalendar>,
    ) -> Vec<EventEntry> {
        let feed_error = match feed {
            Ok(raw) => match self.resolve_feed(&raw, window) {
                Ok(entries) => return entries,
                Err(e) => e,
            },
            Err(e) => e,
        };

        match fallback {
            Some(client) => {
                warn!(error = %feed_error, "calendar feed unusable, querying fallback API");
                match client.list_events(window).await {
                    Ok(entries) => entries,
                    Err(e) => {
                        warn!(error = %e, "calendar fallback failed, reporting no events");
                        Vec::new()
                    }
                }
            }
            None => {
                debug!(error = %feed_error, "calendar feed unusable and no fallback configured");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::models::{EventStamp, RecurrenceRule};
    use super::*;
    use chrono::TimeZone;

    fn resolver() -> CalendarResolver {
        CalendarResolver::new(chrono_tz::UTC)
    }

    fn day_window() -> Window {
        let tz = chrono_tz::UTC;
        Window {
            start: tz.with_ymd_and_hms(2025, 9, 19, 0, 0, 0).unwrap(),
            end: tz.with_ymd_and_hms(2025, 9, 19, 23, 59, 59).unwrap(),
        }
    }

    fn event(title: &str, start_h: u32, end_h: u32, day: u32) -> ParsedEvent {
        let tz = chrono_tz::UTC;
        ParsedEvent {
            title: title.to_string(),
            start: EventStamp::Zoned(
                tz.with_ymd_and_hms(2025, 9, day, start_h, 0, 0)
                    .unwrap()
                    .fixed_offset(),
            ),
            end: Some(EventStamp::Zoned(
                tz.with_ymd_and_hms(2025, 9, day, end_h, 0, 0)
                    .unwrap()
                    .fixed_offset(),
            )),
            rule: None,
        }
    }

    #[test]
    fn event_starting_at_window_end_is_included() {
        let mut at_end = event("Late", 23, 23, 19);
        at_end.start = EventStamp::Zoned(
            chrono_tz::UTC
                .with_ymd_and_hms(2025, 9, 19, 23, 59, 59)
                .unwrap()
                .fixed_offset(),
        );
        at_end.end = None;
        let entries = resolver().collect(&[at_end], &day_window());
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn event_ending_before_window_is_excluded() {
        let entries = resolver().collect(&[event("Old", 8, 9, 18)], &day_window());
        assert!(entries.is_empty());
    }

    #[test]
    fn event_ending_exactly_at_window_start_is_included() {
        let tz = chrono_tz::UTC;
        let mut touching = event("Touch", 23, 23, 18);
        touching.end = Some(EventStamp::Zoned(
            tz.with_ymd_and_hms(2025, 9, 19, 0, 0, 0).unwrap().fixed_offset(),
        ));
        let entries = resolver().collect(&[touching], &day_window());
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn results_sort_by_start_with_feed_order_tiebreak() {
        let events = vec![
            event("Second", 15, 16, 19),
            event("FirstTieA", 9, 10, 19),
            event("FirstTieB", 9, 11, 19),
        ];
        let entries = resolver().collect(&events, &day_window());
        let titles: Vec<_> = entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["FirstTieA", "FirstTieB", "Second"]);
    }

    #[test]
    fn missing_end_defaults_to_one_hour() {
        let mut no_end = event("Open", 10, 11, 19);
        no_end.end = None;
        let entries = resolver().collect(&[no_end], &day_window());
        assert_eq!(entries[0].start, "2025-09-19T10:00:00+00:00");
        assert_eq!(entries[0].end, "2025-09-19T11:00:00+00:00");
    }

    #[test]
    fn recurring_event_with_empty_rule_is_not_treated_as_single() {
        let mut recurring = event("Ghost", 10, 11, 19);
        recurring.rule = Some(RecurrenceRule::parse("X-NOPE=1"));
        let entries = resolver().collect(&[recurring], &day_window());
        assert!(entries.is_empty());
    }

    #[test]
    fn empty_feed_resolves_to_zero_events() {
        let entries = resolver().resolve_feed(b"", &day_window()).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn feed_source_classification() {
        assert!(matches!(
            FeedSource::from_config("https://example.com/cal.ics"),
            FeedSource::Url(_)
        ));
        assert!(matches!(
            FeedSource::from_config("/var/cal/feed.ics"),
            FeedSource::File(_)
        ));
    }
}
