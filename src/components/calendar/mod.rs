use async_trait::async_trait;
use reqwest::Client;

use crate::components::DigestSource;
use crate::config::Config;
use crate::error::DigestResult;
use crate::report::Section;

pub mod expand;
pub mod fallback;
pub mod models;
pub mod normalize;
pub mod parse;
pub mod resolve;
pub mod sanitize;

use fallback::{GoogleCalendarClient, RemoteCalendar};
use models::{EventEntry, Window};
use resolve::{load_feed, CalendarResolver, FeedError, FeedSource};

/// Calendar section of the digest: ICS feed primary, Google Calendar API
/// fallback
pub struct CalendarSource {
    resolver: CalendarResolver,
    source: Option<FeedSource>,
    fallback: Option<GoogleCalendarClient>,
    client: Client,
}

impl CalendarSource {
    pub fn new(config: &Config, client: Client) -> Self {
        Self {
            resolver: CalendarResolver::new(config.timezone),
            source: config
                .ics_source
                .as_deref()
                .map(FeedSource::from_config),
            fallback: config
                .google_calendar_token
                .clone()
                .map(|token| GoogleCalendarClient::new(client.clone(), token)),
            client,
        }
    }

    /// True when either the feed or the fallback is configured
    pub fn configured(&self) -> bool {
        self.source.is_some() || self.fallback.is_some()
    }

    /// Resolve the window's events from the primary feed or the fallback
    pub async fn events(&self, window: &Window) -> Vec<EventEntry> {
        let feed = match &self.source {
            Some(source) => load_feed(&self.client, source).await,
            None => Err(FeedError::NotConfigured),
        };
        let fallback = self
            .fallback
            .as_ref()
            .map(|client| client as &dyn RemoteCalendar);
        self.resolver.resolve(feed, window, fallback).await
    }
}

#[async_trait]
impl DigestSource for CalendarSource {
    fn name(&self) -> &'static str {
        "calendar"
    }

    fn heading(&self) -> &'static str {
        "Calendar"
    }

    async fn collect(&self, window: &Window) -> DigestResult<Section> {
        let events = self.events(window).await;
        let lines = if events.is_empty() {
            vec!["- (no events)".to_string()]
        } else {
            events
                .iter()
                .map(|e| format!("- {} ({} → {})", e.title, e.start, e.end))
                .collect()
        };
        Ok(Section::new(self.heading(), lines))
    }
}
