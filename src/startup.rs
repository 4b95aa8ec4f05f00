use chrono::NaiveDate;
use reqwest::Client;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::components::calendar::CalendarSource;
use crate::components::github::GitHubSource;
use crate::components::jira::JiraSource;
use crate::components::slack::SlackSource;
use crate::components::SourceRegistry;
use crate::config::Config;
use crate::error::Error;
use crate::report;
use crate::utils::time::day_window;

/// Initialize logging with environment-based configuration
pub fn init_logging() -> miette::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Other(format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load the application config
pub fn load_config() -> miette::Result<Config> {
    match Config::load() {
        Ok(config) => Ok(config),
        Err(e) => {
            tracing::error!("Failed to load configuration: {:?}", e);
            Err(e.into())
        }
    }
}

/// Build the source registry from whatever is configured and enabled
pub fn build_registry(config: &Config, client: &Client) -> SourceRegistry {
    let mut registry = SourceRegistry::new();

    if config.is_source_enabled("github") {
        match GitHubSource::from_config(config, client.clone()) {
            Some(source) => registry.register(source),
            None => warn!("GITHUB_TOKEN not set; skipping GitHub"),
        }
    }

    if config.is_source_enabled("jira") {
        match JiraSource::from_config(config, client.clone()) {
            Some(source) => registry.register(source),
            None => warn!("Jira credentials not set; skipping Jira"),
        }
    }

    if config.is_source_enabled("calendar") {
        let source = CalendarSource::new(config, client.clone());
        if source.configured() {
            registry.register(source);
        } else {
            warn!("No GCAL_ICS_URL or GOOGLE_CALENDAR_TOKEN; skipping calendar");
        }
    }

    if config.is_source_enabled("slack") {
        match SlackSource::from_config(config, client.clone()) {
            Some(source) => registry.register(source),
            None => warn!("Slack token not configured; skipping Slack"),
        }
    }

    registry
}

/// Assemble and emit the digest for one report day
pub async fn run_digest(
    config: &Config,
    date: NaiveDate,
    output_override: Option<String>,
) -> miette::Result<()> {
    info!(%date, timezone = %config.timezone, "assembling daily digest");

    let client = Client::new();
    let window = day_window(date, config.timezone);
    let registry = build_registry(config, &client);
    let sections = registry.collect_all(&window).await;

    let content = report::render(date, &sections);
    let output_file = output_override.or_else(|| config.output_file.clone());
    report::emit(date, &content, output_file.as_deref());

    Ok(())
}

/// Print the Slack user map and exit (--slack-dump)
pub async fn run_slack_dump(config: &Config) -> miette::Result<()> {
    let client = Client::new();
    match SlackSource::from_config(config, client) {
        Some(source) => {
            let dump = source.dump_user_map().await.map_err(miette::Report::from)?;
            println!("{}", dump);
            Ok(())
        }
        None => Err(Error::Config("Slack is not configured".to_string()).into()),
    }
}
