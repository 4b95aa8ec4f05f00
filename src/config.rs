use crate::error::{config_error, DigestResult};
use chrono_tz::Tz;
use dotenvy::dotenv;
use std::collections::HashMap;
use std::env;
use std::fs;

/// Default reference timezone for the report
pub const DEFAULT_TIMEZONE: &str = "America/Sao_Paulo";

/// Placeholder title for calendar events without a summary
pub const UNTITLED_EVENT: &str = "(untitled)";

/// Main configuration structure for the digest
#[derive(Debug, Clone)]
pub struct Config {
    /// Reference timezone all report instants are expressed in
    pub timezone: Tz,
    /// GitHub personal access token
    pub github_token: Option<String>,
    /// Repositories to search for pull requests (owner/name)
    pub github_repos: Vec<String>,
    /// Jira instance base URL
    pub jira_base_url: Option<String>,
    /// Jira account email (also the assignee the digest reports on)
    pub jira_email: Option<String>,
    /// Jira API token
    pub jira_token: Option<String>,
    /// Board column names counted as "in progress or review"
    pub jira_active_statuses: Vec<String>,
    /// ICS feed URL or local file path
    pub ics_source: Option<String>,
    /// Google Calendar API bearer token for the feed fallback
    pub google_calendar_token: Option<String>,
    /// Direct Slack user token (skips the refresh flow)
    pub slack_user_token: Option<String>,
    /// Slack OAuth client ID for token refresh
    pub slack_client_id: Option<String>,
    /// Slack OAuth client secret for token refresh
    pub slack_client_secret: Option<String>,
    /// Slack refresh token (env override for the store)
    pub slack_refresh_token: Option<String>,
    /// Path of the Slack token store file
    pub slack_token_store: String,
    /// Slack DM targets by @handle or display name
    pub slack_dm_usernames: Vec<String>,
    /// Slack DM targets by email
    pub slack_dm_emails: Vec<String>,
    /// Slack DM targets by user ID
    pub slack_dm_user_ids: Vec<String>,
    /// Report output file (default: daily_report_{date}.txt)
    pub output_file: Option<String>,
    /// Map of source names to their enabled status
    pub sources: HashMap<String, bool>,
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn list_var(name: &str) -> Vec<String> {
    env::var(name)
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

impl Config {
    /// Load configuration from environment and config file
    pub fn load() -> DigestResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let timezone_name = env::var("TIMEZONE").unwrap_or_else(|_| DEFAULT_TIMEZONE.to_string());
        let timezone = timezone_name
            .parse::<Tz>()
            .map_err(|_| config_error(&format!("Invalid TIMEZONE: {}", timezone_name)))?;

        let jira_active_statuses = {
            let configured = list_var("JIRA_ACTIVE_STATUSES");
            if configured.is_empty() {
                vec!["In Progress".to_string(), "In Review".to_string()]
            } else {
                configured
            }
        };

        // All sources are enabled unless turned off in the config file
        let mut sources = HashMap::new();
        for name in ["github", "jira", "calendar", "slack"] {
            sources.insert(name.to_string(), true);
        }
        if let Ok(content) = fs::read_to_string("config/sources.toml") {
            if let Ok(file_sources) = toml::from_str::<HashMap<String, bool>>(&content) {
                for (key, value) in file_sources {
                    sources.insert(key, value);
                }
            }
        }

        Ok(Config {
            timezone,
            github_token: optional_var("GITHUB_TOKEN"),
            github_repos: list_var("GITHUB_REPOS"),
            jira_base_url: optional_var("JIRA_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string()),
            jira_email: optional_var("JIRA_EMAIL"),
            jira_token: optional_var("JIRA_TOKEN"),
            jira_active_statuses,
            ics_source: optional_var("GCAL_ICS_URL"),
            google_calendar_token: optional_var("GOOGLE_CALENDAR_TOKEN"),
            slack_user_token: optional_var("SLACK_USER_TOKEN"),
            slack_client_id: optional_var("SLACK_CLIENT_ID"),
            slack_client_secret: optional_var("SLACK_CLIENT_SECRET"),
            slack_refresh_token: optional_var("SLACK_REFRESH_TOKEN"),
            slack_token_store: env::var("SLACK_TOKEN_STORE")
                .unwrap_or_else(|_| ".slack_token.json".to_string()),
            slack_dm_usernames: list_var("SLACK_DM_USERNAMES"),
            slack_dm_emails: list_var("SLACK_DM_EMAILS")
                .into_iter()
                .map(|e| e.to_lowercase())
                .collect(),
            slack_dm_user_ids: list_var("SLACK_DM_USER_IDS"),
            output_file: optional_var("OUTPUT_FILE"),
            sources,
        })
    }

    /// Check if a digest source is enabled
    pub fn is_source_enabled(&self, name: &str) -> bool {
        *self.sources.get(name).unwrap_or(&true)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            timezone: chrono_tz::UTC,
            github_token: None,
            github_repos: Vec::new(),
            jira_base_url: None,
            jira_email: None,
            jira_token: None,
            jira_active_statuses: vec!["In Progress".to_string(), "In Review".to_string()],
            ics_source: None,
            google_calendar_token: None,
            slack_user_token: None,
            slack_client_id: None,
            slack_client_secret: None,
            slack_refresh_token: None,
            slack_token_store: ".slack_token.json".to_string(),
            slack_dm_usernames: Vec::new(),
            slack_dm_emails: Vec::new(),
            slack_dm_user_ids: Vec::new(),
            output_file: None,
            sources: HashMap::new(),
        }
    }
}
