//! Slack Web API client.
//!
//! Reads channel history, downloads private files and posts the daily
//! summary with `chat.postMessage`. Every Web API reply carries an `ok` flag;
//! `ok: false` becomes [`RestabotError::Slack`] with Slack's error code.
//!
//! Requires a Bot User OAuth Token (xoxb-...) with `channels:history`,
//! `files:read` and `chat:write`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info};

use restabot_core::{retry_async, RestabotError, RetryPolicy};

use crate::slack_blocks::post_message_body;
use crate::{ChannelAdapter, ChannelFile};

pub use restabot_config::settings::DEFAULT_SLACK_API_URL as DEFAULT_API_URL;

// ---------------------------------------------------------------------------
// Slack wire types
// ---------------------------------------------------------------------------

#[derive(Deserialize, Debug)]
struct Envelope {
    ok: bool,
    error: Option<String>,
}

#[derive(Deserialize, Debug)]
struct HistoryResponse {
    #[serde(default)]
    messages: Vec<SlackMessage>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SlackMessage {
    pub ts: String,
    #[serde(default)]
    pub files: Vec<SlackFile>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SlackFile {
    pub url_private_download: Option<String>,
    pub url_private: Option<String>,
    pub filetype: Option<String>,
    pub mimetype: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct SlackClient {
    http_client: Client,
    bot_token: String,
    base_url: String,
    retry: RetryPolicy,
}

impl SlackClient {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            bot_token: bot_token.into(),
            base_url: DEFAULT_API_URL.to_string(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }

    /// Send a Web API call and decode its body, honoring the `ok` flag.
    async fn call<T: DeserializeOwned>(&self, method: &str, request: RequestBuilder) -> Result<T> {
        let response = request
            .bearer_auth(&self.bot_token)
            .send()
            .await
            .with_context(|| format!("Slack {method} request failed"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RestabotError::api("Slack", status.as_u16(), body).into());
        }

        let body: serde_json::Value = response
            .json()
            .await
            .with_context(|| format!("Failed to parse Slack {method} response"))?;
        let envelope: Envelope = serde_json::from_value(body.clone())
            .with_context(|| format!("Slack {method} response has no `ok` flag"))?;
        if !envelope.ok {
            let code = envelope.error.unwrap_or_else(|| "unknown_error".to_string());
            return Err(RestabotError::Slack(code).into());
        }
        serde_json::from_value(body).with_context(|| format!("Unexpected Slack {method} response"))
    }

    /// Messages posted to `channel` after `oldest`.
    pub async fn conversations_history(
        &self,
        channel: &str,
        oldest: DateTime<Utc>,
    ) -> Result<Vec<SlackMessage>> {
        let oldest = oldest.timestamp().to_string();
        let history: HistoryResponse = retry_async(&self.retry, "conversations.history", || {
            let request = self
                .http_client
                .get(self.url("conversations.history"))
                .query(&[("channel", channel), ("oldest", oldest.as_str()), ("limit", "200")]);
            self.call("conversations.history", request)
        })
        .await?;
        debug!(channel, count = history.messages.len(), "Fetched channel history");
        Ok(history.messages)
    }

    pub async fn post_message(&self, channel: &str, markdown: &str) -> Result<()> {
        let body = post_message_body(channel, markdown);
        let _: serde_json::Value = retry_async(&self.retry, "chat.postMessage", || {
            let request = self.http_client.post(self.url("chat.postMessage")).json(&body);
            self.call("chat.postMessage", request)
        })
        .await?;
        info!("[Slack] Sent message to channel {}", channel);
        Ok(())
    }

    /// Fetch a private file with the bot token.
    pub async fn download_file(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .http_client
            .get(url)
            .bearer_auth(&self.bot_token)
            .send()
            .await
            .context("Slack file download failed")?;
        if response.status() != StatusCode::OK {
            anyhow::bail!(
                "Failed to download photo. Status code: {}",
                response.status().as_u16()
            );
        }
        let bytes = response.bytes().await.context("Failed to read Slack file")?;
        Ok(bytes.to_vec())
    }
}

/// Slack timestamps are `<seconds>.<micros>` strings.
fn ts_key(ts: &str) -> (u64, u64) {
    let (secs, frac) = ts.split_once('.').unwrap_or((ts, "0"));
    (secs.parse().unwrap_or(0), frac.parse().unwrap_or(0))
}

/// The first file of the newest message that has one.
pub fn latest_file_in(channel: &str, messages: &[SlackMessage]) -> Result<ChannelFile> {
    if messages.is_empty() {
        anyhow::bail!("No messages found in channel {channel}");
    }
    let newest = messages
        .iter()
        .filter(|m| !m.files.is_empty())
        .max_by_key(|m| ts_key(&m.ts))
        .with_context(|| format!("No message with files found in channel {channel}"))?;

    let file = &newest.files[0];
    let url = file
        .url_private_download
        .clone()
        .or_else(|| file.url_private.clone())
        .with_context(|| format!("Newest file in channel {channel} has no download URL"))?;
    Ok(ChannelFile {
        url,
        filetype: file.filetype.clone(),
        mimetype: file.mimetype.clone(),
    })
}

#[async_trait]
impl ChannelAdapter for SlackClient {
    fn name(&self) -> &str {
        "slack"
    }

    async fn post_markdown(&self, channel: &str, markdown: &str) -> Result<()> {
        self.post_message(channel, markdown).await
    }

    async fn latest_file(&self, channel: &str, since: DateTime<Utc>) -> Result<ChannelFile> {
        let messages = self.conversations_history(channel, since).await?;
        latest_file_in(channel, &messages)
    }

    async fn download(&self, file: &ChannelFile) -> Result<Vec<u8>> {
        self.download_file(&file.url).await
    }
}
