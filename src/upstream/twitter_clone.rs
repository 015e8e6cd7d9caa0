//! Client for the external Twitter Clone REST API.

use std::time::Duration;

use reqwest::{Client, Response};
use serde_json::Value;
use thiserror::Error;

use crate::config::TwitterCloneConfig;
use crate::logic::extract_records;
use crate::model::ExternalPostPayload;

pub const DEFAULT_POST_MESSAGE: &str = "Tweet proxied successfully!";

#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The API key is missing, so no request was attempted
    #[error("Backend: TWITTER_CLONE_API_KEY not configured in environment variables.")]
    NotConfigured,

    /// The upstream answered with a non-2xx status
    #[error("External API error: {body}")]
    Status { status: u16, body: String },

    /// The upstream could not be reached
    #[error("Failed to connect to external tweet service: {0}")]
    Network(reqwest::Error),

    /// The upstream answered but the body was unusable
    #[error("An unexpected error occurred: {0}")]
    Decode(String),
}

/// Result of relaying a tweet
#[derive(Debug, Clone, PartialEq)]
pub struct PostOutcome {
    pub message: String,
    pub tweet_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TwitterCloneClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    username: String,
}

impl TwitterCloneClient {
    pub fn new(config: &TwitterCloneConfig) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(format!("tweet-proxy/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(UpstreamError::Network)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key().map(str::to_string),
            username: config.external_username(),
        })
    }

    /// Account the proxy posts as and filters listings by
    pub fn username(&self) -> &str {
        &self.username
    }

    fn api_key(&self) -> Result<&str, UpstreamError> {
        self.api_key.as_deref().ok_or(UpstreamError::NotConfigured)
    }

    /// Relay a tweet to `POST /post_tweet`
    pub async fn post_tweet(&self, text: &str) -> Result<PostOutcome, UpstreamError> {
        let api_key = self.api_key()?;
        let url = format!("{}/post_tweet", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("api-key", api_key)
            .json(&ExternalPostPayload {
                username: &self.username,
                text,
            })
            .send()
            .await
            .map_err(|e| {
                log::error!("Network error proxying tweet: {}", e);
                UpstreamError::Network(e)
            })?;

        let body = read_json(response).await?;
        log::info!("Successfully proxied tweet. External API response: {}", body);

        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_POST_MESSAGE)
            .to_string();
        let tweet_id = body.get("tweet_id").and_then(id_to_string);

        Ok(PostOutcome { message, tweet_id })
    }

    /// Fetch every tweet from `GET /tweets` as raw records
    pub async fn list_tweets(&self) -> Result<Vec<Value>, UpstreamError> {
        let api_key = self.api_key()?;
        let url = format!("{}/tweets", self.base_url);
        log::info!("Fetching all tweets from {}", url);

        let response = self
            .client
            .get(&url)
            .header("api-key", api_key)
            .send()
            .await
            .map_err(|e| {
                log::error!("Network error fetching external tweets: {}", e);
                UpstreamError::Network(e)
            })?;

        let records = extract_records(read_json(response).await?);
        log::info!("Fetched {} tweets from external API", records.len());
        Ok(records)
    }
}

/// Fail on non-2xx statuses, keeping the status and body, then decode JSON
async fn read_json(response: Response) -> Result<Value, UpstreamError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        log::error!("External API error: {} - {}", status.as_u16(), body);
        return Err(UpstreamError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let bytes = response.bytes().await.map_err(UpstreamError::Network)?;
    serde_json::from_slice(&bytes).map_err(|e| UpstreamError::Decode(e.to_string()))
}

/// Tweet ids may come back as numbers or strings; null means absent
fn id_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
