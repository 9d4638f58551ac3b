use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub mod download;
pub mod slack;
pub mod slack_blocks;
pub mod upload;

pub use download::slack_download_task;
pub use slack::{SlackClient, SlackMessage};
pub use slack_blocks::{markdown_block, post_message_body};
pub use upload::slack_upload_task;

/// A file attached to a channel message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelFile {
    pub url: String,
    /// Short type reported by the platform, e.g. `jpg`.
    pub filetype: Option<String>,
    pub mimetype: Option<String>,
}

impl ChannelFile {
    /// Extension to save the file under: the reported type, then the MIME
    /// type, then the URL's extension, falling back to `jpg`.
    pub fn extension(&self) -> String {
        if let Some(filetype) = self.filetype.as_deref().filter(|t| is_extension(t)) {
            return filetype.to_ascii_lowercase();
        }
        if let Some(ext) = self
            .mimetype
            .as_deref()
            .and_then(restabot_core::extension_for_mime)
        {
            return ext.to_string();
        }
        let path = self.url.split(['?', '#']).next().unwrap_or_default();
        let last_segment = path.rsplit('/').next().unwrap_or_default();
        match last_segment.rsplit_once('.') {
            Some((_, ext)) if is_extension(ext) => ext.to_ascii_lowercase(),
            _ => "jpg".to_string(),
        }
    }
}

fn is_extension(s: &str) -> bool {
    !s.is_empty() && s.len() <= 5 && s.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Chat platforms that hold menu photos and receive the daily summary.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Human-readable adapter name for logging.
    fn name(&self) -> &str;

    /// Post a Markdown message to `channel`.
    async fn post_markdown(&self, channel: &str, markdown: &str) -> Result<()>;

    /// The file of the most recent message with attachments posted after `since`.
    async fn latest_file(&self, channel: &str, since: DateTime<Utc>) -> Result<ChannelFile>;

    async fn download(&self, file: &ChannelFile) -> Result<Vec<u8>>;
}
