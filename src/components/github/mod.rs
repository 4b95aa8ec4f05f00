use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use tracing::warn;

use crate::components::calendar::models::Window;
use crate::components::DigestSource;
use crate::config::Config;
use crate::error::DigestResult;
use crate::report::Section;

pub mod models;

use models::PullRequest;

/// GitHub section of the digest: pull requests updated on the report date
/// across the configured repositories
pub struct GitHubSource {
    client: Client,
    token: String,
    repos: Vec<String>,
}

impl GitHubSource {
    /// Build the source if a token is configured
    pub fn from_config(config: &Config, client: Client) -> Option<Self> {
        let token = config.github_token.clone()?;
        Some(Self {
            client,
            token,
            repos: config.github_repos.clone(),
        })
    }

    /// Search each repository for pull requests updated since the date.
    /// Per-repo failures are warnings; the remaining repos still report.
    pub async fn pull_requests(&self, since: NaiveDate) -> Vec<PullRequest> {
        let mut prs = Vec::new();

        for repo in &self.repos {
            // Probe repository access first so a bad repo name gets a
            // specific warning instead of an empty search result
            let repo_url = format!("https://api.github.com/repos/{}", repo);
            match self.get(&repo_url).await {
                Ok(response) if response.status().as_u16() == 404 => {
                    warn!(repo, "repository not found");
                    continue;
                }
                Ok(response) if !response.status().is_success() => {
                    warn!(repo, status = %response.status(), "repository not accessible");
                    continue;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(repo, error = %e, "GitHub request failed");
                    continue;
                }
            }

            let query = format!("repo:{} type:pr updated:>={}", repo, since.format("%Y-%m-%d"));
            let mut search_url = match url::Url::parse("https://api.github.com/search/issues") {
                Ok(u) => u,
                Err(e) => {
                    warn!(error = %e, "failed to build search URL");
                    continue;
                }
            };
            search_url.query_pairs_mut().append_pair("q", &query);

            let response = match self.get(search_url.as_str()).await {
                Ok(r) => r,
                Err(e) => {
                    warn!(repo, error = %e, "GitHub search failed");
                    continue;
                }
            };
            if !response.status().is_success() {
                warn!(repo, status = %response.status(), "GitHub search rejected");
                continue;
            }

            let data: serde_json::Value = match response.json().await {
                Ok(d) => d,
                Err(e) => {
                    warn!(repo, error = %e, "GitHub search response unreadable");
                    continue;
                }
            };
            let items = data
                .get("items")
                .and_then(|i| i.as_array())
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            for item in items {
                prs.push(PullRequest {
                    title: json_str(item, "title"),
                    url: json_str(item, "html_url"),
                    state: json_str(item, "state"),
                    repo: repo.clone(),
                });
            }
        }

        prs
    }

    async fn get(&self, url: &str) -> reqwest::Result<reqwest::Response> {
        self.client
            .get(url)
            .header("Authorization", format!("token {}", self.token))
            .header("User-Agent", "daily-digest")
            .send()
            .await
    }
}

fn json_str(value: &serde_json::Value, key: &str) -> String {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

#[async_trait]
impl DigestSource for GitHubSource {
    fn name(&self) -> &'static str {
        "github"
    }

    fn heading(&self) -> &'static str {
        "GitHub PRs"
    }

    async fn collect(&self, window: &Window) -> DigestResult<Section> {
        let prs = self.pull_requests(window.start.date_naive()).await;
        let lines = if prs.is_empty() {
            vec!["- (no pull requests)".to_string()]
        } else {
            prs.iter()
                .map(|pr| format!("- [{}] {} ({}) - {}", pr.repo, pr.title, pr.state, pr.url))
                .collect()
        };
        Ok(Section::new(self.heading(), lines))
    }
}
