use async_trait::async_trait;
use chrono::TimeZone;
use chrono_tz::Tz;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

use crate::components::calendar::models::Window;
use crate::components::DigestSource;
use crate::config::Config;
use crate::error::DigestResult;
use crate::report::Section;

pub mod models;
pub mod token;

use models::{HuddleAction, HuddleSession};
use token::TokenManager;

const JOIN_MARKERS: &[&str] = &["joined", "iniciou", "started", "entrou"];
const END_MARKERS: &[&str] = &["ended", "left", "saiu"];
const HUDDLE_MARKERS: &[&str] = &[
    "iniciou um huddle",
    "huddle iniciado",
    "started a huddle",
    "joined the huddle",
    "huddle ended",
    "entrou no huddle",
    "saiu do huddle",
    "left the huddle",
];

/// Slack section of the digest: huddle activity detected in DMs with the
/// configured teammates
pub struct SlackSource {
    client: Client,
    tokens: TokenManager,
    tz: Tz,
    usernames: Vec<String>,
    emails: Vec<String>,
    user_ids: Vec<String>,
}

impl SlackSource {
    /// Build the source if any token path is configured
    pub fn from_config(config: &Config, client: Client) -> Option<Self> {
        let has_direct = config.slack_user_token.is_some();
        let has_refresh = config.slack_client_id.is_some()
            && config.slack_client_secret.is_some()
            && config.slack_refresh_token.is_some();
        if !has_direct && !has_refresh {
            return None;
        }
        Some(Self {
            tokens: TokenManager::new(config, client.clone()),
            client,
            tz: config.timezone,
            usernames: config.slack_dm_usernames.clone(),
            emails: config.slack_dm_emails.clone(),
            user_ids: config.slack_dm_user_ids.clone(),
        })
    }

    /// Map of lowercased @handle/@display/@real-name and email to user ID,
    /// paginated through users.list
    pub async fn user_map(&self, token: &str) -> DigestResult<HashMap<String, String>> {
        let mut users = HashMap::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut params: Vec<(&str, String)> = vec![("limit", "200".to_string())];
            if let Some(c) = &cursor {
                params.push(("cursor", c.clone()));
            }
            let response: Value = self
                .client
                .get("https://slack.com/api/users.list")
                .bearer_auth(token)
                .query(&params)
                .send()
                .await?
                .json()
                .await?;
            if !response.get("ok").and_then(Value::as_bool).unwrap_or(false) {
                break;
            }

            for member in response.get("members").and_then(Value::as_array).into_iter().flatten() {
                let Some(id) = member.get("id").and_then(Value::as_str) else {
                    continue;
                };
                let profile = member.get("profile").cloned().unwrap_or(Value::Null);
                let keys = [
                    member.get("name").and_then(Value::as_str).map(|n| format!("@{}", n)),
                    profile
                        .get("display_name_normalized")
                        .and_then(Value::as_str)
                        .filter(|s| !s.is_empty())
                        .map(|n| format!("@{}", n)),
                    profile
                        .get("real_name_normalized")
                        .and_then(Value::as_str)
                        .filter(|s| !s.is_empty())
                        .map(|n| format!("@{}", n)),
                    profile.get("email").and_then(Value::as_str).map(str::to_string),
                ];
                for key in keys.into_iter().flatten() {
                    users.insert(key.to_lowercase(), id.to_string());
                }
            }

            cursor = response
                .get("response_metadata")
                .and_then(|m| m.get("next_cursor"))
                .and_then(Value::as_str)
                .filter(|c| !c.is_empty())
                .map(str::to_string);
            if cursor.is_none() {
                break;
            }
        }

        Ok(users)
    }

    /// Resolve configured targets to user IDs, filling e-mail gaps with
    /// users.lookupByEmail; unresolvable targets get a warning
    async fn target_ids(&self, token: &str, users: &mut HashMap<String, String>) -> Vec<String> {
        let mut ids = Vec::new();

        for email in &self.emails {
            if users.contains_key(email) {
                continue;
            }
            let response: Result<Value, _> = async {
                self.client
                    .get("https://slack.com/api/users.lookupByEmail")
                    .bearer_auth(token)
                    .query(&[("email", email.as_str())])
                    .send()
                    .await?
                    .json()
                    .await
            }
            .await;
            if let Ok(data) = response {
                if data.get("ok").and_then(Value::as_bool).unwrap_or(false) {
                    if let Some(id) = data
                        .get("user")
                        .and_then(|u| u.get("id"))
                        .and_then(Value::as_str)
                    {
                        users.insert(email.clone(), id.to_string());
                    }
                }
            }
        }

        for username in &self.usernames {
            match users.get(&username.to_lowercase()) {
                Some(id) => ids.push(id.clone()),
                None => warn!(username, "Slack user not found"),
            }
        }
        for email in &self.emails {
            match users.get(email) {
                Some(id) => ids.push(id.clone()),
                None => warn!(email, "Slack user not found"),
            }
        }
        ids.extend(self.user_ids.iter().cloned());
        ids
    }

    /// Detect huddle activity in DMs with the configured targets inside the
    /// window, ordered by timestamp
    pub async fn huddle_sessions(&self, window: &Window) -> DigestResult<Vec<HuddleSession>> {
        let Some(token) = self.tokens.access_token().await else {
            return Ok(Vec::new());
        };

        let mut users = self.user_map(&token).await?;
        let names_by_id: HashMap<String, String> = users
            .iter()
            .map(|(name, id)| (id.clone(), name.trim_start_matches('@').to_string()))
            .collect();
        let target_ids = self.target_ids(&token, &mut users).await;

        let mut sessions = Vec::new();
        for user_id in &target_ids {
            let participant = names_by_id.get(user_id).cloned().unwrap_or_else(|| user_id.clone());

            let opened: Value = self
                .client
                .post("https://slack.com/api/conversations.open")
                .bearer_auth(&token)
                .form(&[("users", user_id.as_str())])
                .send()
                .await?
                .json()
                .await?;
            let Some(dm_id) = opened
                .get("channel")
                .and_then(|c| c.get("id"))
                .and_then(Value::as_str)
                .filter(|_| opened.get("ok").and_then(Value::as_bool).unwrap_or(false))
            else {
                warn!(user_id, "could not open Slack DM");
                continue;
            };

            let history: Value = self
                .client
                .get("https://slack.com/api/conversations.history")
                .bearer_auth(&token)
                .query(&[
                    ("channel", dm_id),
                    ("oldest", &window.start.timestamp().to_string()),
                    ("latest", &window.end.timestamp().to_string()),
                    ("inclusive", "true"),
                ])
                .send()
                .await?
                .json()
                .await?;
            if !history.get("ok").and_then(Value::as_bool).unwrap_or(false) {
                continue;
            }

            for message in history.get("messages").and_then(Value::as_array).into_iter().flatten() {
                let text = message.get("text").and_then(Value::as_str).unwrap_or("");
                let subtype = message.get("subtype").and_then(Value::as_str).unwrap_or("");
                if !is_huddle_message(text, subtype) {
                    continue;
                }
                let timestamp = message
                    .get("ts")
                    .and_then(Value::as_str)
                    .and_then(|ts| ts.parse::<f64>().ok())
                    .unwrap_or(0.0);
                let local = self
                    .tz
                    .timestamp_opt(timestamp as i64, 0)
                    .single()
                    .unwrap_or_else(|| window.start.with_timezone(&self.tz));

                sessions.push(HuddleSession {
                    participant: participant.clone(),
                    time: local.format("%H:%M").to_string(),
                    date: local.format("%Y-%m-%d").to_string(),
                    action: classify(text),
                    timestamp,
                });
            }
        }

        sessions.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        Ok(sessions)
    }

    /// Print the resolved user map as JSON (--slack-dump)
    pub async fn dump_user_map(&self) -> DigestResult<String> {
        let Some(token) = self.tokens.access_token().await else {
            return Ok("{}".to_string());
        };
        let users = self.user_map(&token).await?;
        let sorted: std::collections::BTreeMap<_, _> = users.into_iter().collect();
        Ok(serde_json::to_string_pretty(&sorted)?)
    }
}

fn is_huddle_message(text: &str, subtype: &str) -> bool {
    let lower = text.to_lowercase();
    subtype.to_lowercase().contains("huddle")
        || lower.contains("huddle")
        || HUDDLE_MARKERS.iter().any(|m| lower.contains(m))
}

fn classify(text: &str) -> HuddleAction {
    let lower = text.to_lowercase();
    if JOIN_MARKERS.iter().any(|m| lower.contains(m)) {
        HuddleAction::Joined
    } else if END_MARKERS.iter().any(|m| lower.contains(m)) {
        HuddleAction::Ended
    } else {
        HuddleAction::Activity
    }
}

#[async_trait]
impl DigestSource for SlackSource {
    fn name(&self) -> &'static str {
        "slack"
    }

    fn heading(&self) -> &'static str {
        "Slack Huddles"
    }

    async fn collect(&self, window: &Window) -> DigestResult<Section> {
        let sessions = self.huddle_sessions(window).await?;
        let lines = if sessions.is_empty() {
            vec!["- (no huddles)".to_string()]
        } else {
            // Group by participant, keeping first-seen order
            let mut participants: Vec<&str> = Vec::new();
            for session in &sessions {
                if !participants.contains(&session.participant.as_str()) {
                    participants.push(&session.participant);
                }
            }
            let mut lines = Vec::new();
            for participant in participants {
                lines.push(format!("\n**{}:**", participant));
                for session in sessions.iter().filter(|s| s.participant == participant) {
                    lines.push(format!(
                        "  - {} - {} huddle",
                        session.time,
                        session.action.label()
                    ));
                }
            }
            lines
        };
        Ok(Section::new(self.heading(), lines))
    }
}
