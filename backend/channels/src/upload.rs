//! Summary upload stage.

use restabot_core::SlackUploadTaskOutput;
use restabot_logging::redact_sensitive_data;
use tracing::{error, info};

use crate::ChannelAdapter;

/// Post `summary` to `channel`. Failures are reported in the output, not raised.
pub async fn slack_upload_task(
    adapter: &dyn ChannelAdapter,
    channel: &str,
    summary: &str,
) -> SlackUploadTaskOutput {
    match adapter.post_markdown(channel, summary).await {
        Ok(()) => {
            info!("Successfully posted message to {} channel {}", adapter.name(), channel);
            SlackUploadTaskOutput { error: None }
        }
        Err(e) => {
            let message = format!("Error posting message to Slack: {e}");
            error!("{}", redact_sensitive_data(&message));
            SlackUploadTaskOutput {
                error: Some(message),
            }
        }
    }
}
