use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{source_error, DigestResult};

/// Persisted Slack OAuth token state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenStore {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<i64>,
}

/// Resolves a usable Slack access token: direct env token first, then an
/// unexpired stored token, then a refresh round-trip that rotates the
/// stored refresh token.
pub struct TokenManager {
    client: Client,
    store_path: String,
    user_token: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    env_refresh_token: Option<String>,
}

impl TokenManager {
    pub fn new(config: &Config, client: Client) -> Self {
        Self {
            client,
            store_path: config.slack_token_store.clone(),
            user_token: config.slack_user_token.clone(),
            client_id: config.slack_client_id.clone(),
            client_secret: config.slack_client_secret.clone(),
            env_refresh_token: config.slack_refresh_token.clone(),
        }
    }

    /// Get an access token, or None when Slack is not usable at all
    pub async fn access_token(&self) -> Option<String> {
        if let Some(token) = &self.user_token {
            return Some(token.clone());
        }

        let store = self.load_store();
        let now = Utc::now().timestamp();
        if let (Some(token), Some(expires_at)) = (&store.access_token, store.expires_at) {
            // A minute of slack so the token does not expire mid-digest
            if expires_at > now + 60 {
                return Some(token.clone());
            }
        }

        match self.refresh(&store).await {
            Ok(token) => Some(token),
            Err(e) => {
                warn!(error = %e, "Slack token unavailable, skipping Slack");
                None
            }
        }
    }

    /// Refresh an expired token and persist the rotated credentials
    async fn refresh(&self, store: &TokenStore) -> DigestResult<String> {
        let refresh_token = store
            .refresh_token
            .clone()
            .or_else(|| self.env_refresh_token.clone())
            .ok_or_else(|| source_error("No Slack refresh token available"))?;
        let client_id = self
            .client_id
            .clone()
            .ok_or_else(|| source_error("No Slack client ID configured"))?;
        let client_secret = self
            .client_secret
            .clone()
            .ok_or_else(|| source_error("No Slack client secret configured"))?;

        let params = [
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("grant_type", "refresh_token".to_string()),
            ("refresh_token", refresh_token.clone()),
        ];
        let response: serde_json::Value = self
            .client
            .post("https://slack.com/api/oauth.v2.access")
            .form(&params)
            .send()
            .await?
            .json()
            .await?;

        if !response.get("ok").and_then(|v| v.as_bool()).unwrap_or(false) {
            return Err(source_error(&format!(
                "Slack token refresh rejected: {}",
                response.get("error").and_then(|v| v.as_str()).unwrap_or("unknown")
            )));
        }

        let access_token = response
            .get("access_token")
            .or_else(|| response.get("token"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| source_error("Slack refresh response missing access token"))?
            .to_string();
        let rotated_refresh = response
            .get("refresh_token")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or(refresh_token);
        let expires_in = response
            .get("expires_in")
            .and_then(|v| v.as_i64())
            .unwrap_or(12 * 60 * 60);

        self.save_store(&TokenStore {
            access_token: Some(access_token.clone()),
            refresh_token: Some(rotated_refresh),
            expires_at: Some(Utc::now().timestamp() + expires_in),
        });

        Ok(access_token)
    }

    fn load_store(&self) -> TokenStore {
        if !Path::new(&self.store_path).exists() {
            return TokenStore::default();
        }
        match fs::read_to_string(&self.store_path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(e) => {
                debug!(error = %e, "could not read Slack token store");
                TokenStore::default()
            }
        }
    }

    fn save_store(&self, store: &TokenStore) {
        match serde_json::to_string_pretty(store) {
            Ok(json) => {
                if let Err(e) = fs::write(&self.store_path, json) {
                    warn!(error = %e, "could not write Slack token store");
                }
            }
            Err(e) => warn!(error = %e, "could not serialize Slack token store"),
        }
    }
}
