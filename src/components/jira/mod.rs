use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::NaiveDate;
use reqwest::Client;
use serde_json::Value;
use tracing::warn;

use crate::components::calendar::models::Window;
use crate::components::DigestSource;
use crate::config::Config;
use crate::error::{source_error, DigestResult};
use crate::report::Section;

pub mod models;

use models::{IssueMovement, JiraIssue, JiraStatus, StatusChange};

/// Jira section of the digest: issues in active columns plus the card
/// movements that happened on the report date
pub struct JiraSource {
    client: Client,
    base_url: String,
    email: String,
    auth_header: String,
    active_statuses: Vec<String>,
}

impl JiraSource {
    /// Build the source if base URL, email and token are all configured
    pub fn from_config(config: &Config, client: Client) -> Option<Self> {
        let base_url = config.jira_base_url.clone()?;
        let email = config.jira_email.clone()?;
        let token = config.jira_token.clone()?;
        let auth = STANDARD.encode(format!("{}:{}", email, token));
        Some(Self {
            client,
            base_url,
            email,
            auth_header: format!("Basic {}", auth),
            active_statuses: config.jira_active_statuses.clone(),
        })
    }

    /// Current active issues and the day's movements for the configured user
    pub async fn enhanced_status(&self, target_date: NaiveDate) -> DigestResult<JiraStatus> {
        let mut result = JiraStatus::default();
        let search_url = format!("{}/rest/api/3/search", self.base_url);

        // Recent assigned issues, filtered to active columns in code since
        // JQL status names vary per board
        let status_jql = format!(
            "assignee = '{}' AND updated >= -30d ORDER BY status ASC, updated DESC",
            self.email
        );
        let data = self
            .search(&search_url, &status_jql, "summary,status,key,updated,assignee", 100)
            .await?;
        for issue in issues_of(&data) {
            let status = field_str(issue, "status")
                .and_then(|s| s.get("name"))
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            if self.active_statuses.iter().any(|s| s == &status) {
                result.current_status.push(JiraIssue {
                    key: key_of(issue),
                    summary: summary_of(issue),
                    status,
                    updated: updated_of(issue),
                });
            }
        }

        // Issues updated on the target date; the changelog tells which of
        // them actually changed column that day
        let day = target_date.format("%Y-%m-%d").to_string();
        let movements_jql = format!(
            "assignee = '{}' AND updated >= '{}' AND updated <= '{}' ORDER BY updated DESC",
            self.email, day, day
        );
        let data = self
            .search(&search_url, &movements_jql, "summary,status,key,updated", 50)
            .await?;
        for issue in issues_of(&data) {
            let key = key_of(issue);
            if key.is_empty() {
                continue;
            }
            match self.status_changes(&key, &day).await {
                Ok(changes) if !changes.is_empty() => {
                    result.movements.push(IssueMovement {
                        key,
                        summary: summary_of(issue),
                        changes,
                    });
                }
                Ok(_) => {}
                Err(e) => warn!(key, error = %e, "failed to read issue changelog"),
            }
        }

        Ok(result)
    }

    /// Status transitions of one issue dated on the report day
    async fn status_changes(&self, key: &str, day: &str) -> DigestResult<Vec<StatusChange>> {
        let url = format!("{}/rest/api/3/issue/{}/changelog", self.base_url, key);
        let response = self
            .client
            .get(&url)
            .header("Authorization", &self.auth_header)
            .header("Content-Type", "application/json")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(source_error(&format!(
                "Jira changelog HTTP {} for {}",
                response.status(),
                key
            )));
        }
        let data: Value = response.json().await?;

        let mut changes = Vec::new();
        for history in data.get("values").and_then(Value::as_array).into_iter().flatten() {
            let created = history
                .get("created")
                .and_then(Value::as_str)
                .unwrap_or("");
            if !created.starts_with(day) {
                continue;
            }
            for item in history.get("items").and_then(Value::as_array).into_iter().flatten() {
                if item.get("field").and_then(Value::as_str) == Some("status") {
                    changes.push(StatusChange {
                        from: str_of(item, "fromString"),
                        to: str_of(item, "toString"),
                        time: created.to_string(),
                    });
                }
            }
        }
        Ok(changes)
    }

    async fn search(
        &self,
        url: &str,
        jql: &str,
        fields: &str,
        max_results: u32,
    ) -> DigestResult<Value> {
        let response = self
            .client
            .get(url)
            .header("Authorization", &self.auth_header)
            .header("Content-Type", "application/json")
            .query(&[
                ("jql", jql),
                ("fields", fields),
                ("maxResults", &max_results.to_string()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(source_error(&format!(
                "Jira search HTTP {}",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }
}

fn issues_of(data: &Value) -> impl Iterator<Item = &Value> {
    data.get("issues")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

fn field_str<'a>(issue: &'a Value, field: &str) -> Option<&'a Value> {
    issue.get("fields").and_then(|f| f.get(field))
}

fn str_of(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}

fn key_of(issue: &Value) -> String {
    str_of(issue, "key")
}

fn summary_of(issue: &Value) -> String {
    field_str(issue, "summary")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}

fn updated_of(issue: &Value) -> String {
    field_str(issue, "updated")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}

#[async_trait]
impl DigestSource for JiraSource {
    fn name(&self) -> &'static str {
        "jira"
    }

    fn heading(&self) -> &'static str {
        "Jira Status"
    }

    async fn collect(&self, window: &Window) -> DigestResult<Section> {
        let date = window.start.date_naive();
        let status = self.enhanced_status(date).await?;
        Ok(Section::new(self.heading(), render_lines(&status, date)))
    }
}

/// Current issues grouped by status, then per-issue movements
fn render_lines(status: &JiraStatus, date: NaiveDate) -> Vec<String> {
    let mut lines = vec!["### My Issues in Progress & Review:".to_string()];

    if status.current_status.is_empty() {
        lines.push("- (no issues in progress or review)".to_string());
    } else {
        let mut seen = Vec::new();
        for issue in &status.current_status {
            if !seen.contains(&issue.status) {
                seen.push(issue.status.clone());
            }
        }
        for group in &seen {
            lines.push(format!("\n**{}:**", group));
            for issue in status.current_status.iter().filter(|i| &i.status == group) {
                lines.push(format!("  - {}: {}", issue.key, issue.summary));
            }
        }
    }

    lines.push(format!("\n### My Card Movements on {}:", date));
    if status.movements.is_empty() {
        lines.push("- (no card movements)".to_string());
    } else {
        for movement in &status.movements {
            lines.push(format!("\n**{}**: {}", movement.key, movement.summary));
            for change in &movement.changes {
                let time = change.time.get(11..16).unwrap_or("");
                lines.push(format!("  - {} Moved: {} → {}", time, change.from, change.to));
            }
        }
    }

    lines
}
