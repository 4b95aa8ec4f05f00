use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use url::Url;

use super::models::{EventEntry, Window};
use crate::config::UNTITLED_EVENT;
use crate::error::{calendar_error, DigestResult};

/// A remote calendar API that can serve window-scoped events when the ICS
/// feed is unusable. Results are already timezone-converted ISO-8601
/// strings and are returned to the caller verbatim.
#[async_trait]
pub trait RemoteCalendar: Send + Sync {
    async fn list_events(&self, window: &Window) -> DigestResult<Vec<EventEntry>>;
}

/// Google Calendar API client used as the feed fallback
pub struct GoogleCalendarClient {
    client: Client,
    token: String,
}

impl GoogleCalendarClient {
    pub fn new(client: Client, token: String) -> Self {
        Self { client, token }
    }
}

#[async_trait]
impl RemoteCalendar for GoogleCalendarClient {
    async fn list_events(&self, window: &Window) -> DigestResult<Vec<EventEntry>> {
        let mut url =
            Url::parse("https://www.googleapis.com/calendar/v3/calendars/primary/events")
                .map_err(|e| calendar_error(&format!("Failed to parse URL: {}", e)))?;

        let time_min = window.start.with_timezone(&Utc).to_rfc3339();
        let time_max = window.end.with_timezone(&Utc).to_rfc3339();
        url.query_pairs_mut()
            .append_pair("timeMin", &time_min)
            .append_pair("timeMax", &time_max)
            .append_pair("singleEvents", "true")
            .append_pair("orderBy", "startTime");

        let response = self
            .client
            .get(url)
            .header("Authorization", format!("Bearer {}", self.token))
            .send()
            .await
            .map_err(|e| calendar_error(&format!("Failed to fetch events: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(calendar_error(&format!(
                "Failed to fetch events: HTTP {} - {}",
                status, error_body
            )));
        }

        let response_data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| calendar_error(&format!("Failed to parse events response: {}", e)))?;

        let items = response_data
            .get("items")
            .and_then(|i| i.as_array())
            .ok_or_else(|| calendar_error("No items in response"))?;

        let entries = items
            .iter()
            .filter_map(|event| {
                let title = event
                    .get("summary")
                    .and_then(|s| s.as_str())
                    .unwrap_or(UNTITLED_EVENT)
                    .to_string();
                let start = instant_field(event, "start")?;
                let end = instant_field(event, "end")?;
                Some(EventEntry { title, start, end })
            })
            .collect();

        Ok(entries)
    }
}

/// Pull `dateTime` (timed) or `date` (all-day) out of a start/end object
fn instant_field(event: &serde_json::Value, key: &str) -> Option<String> {
    let field = event.get(key)?;
    field
        .get("dateTime")
        .or_else(|| field.get("date"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
}
