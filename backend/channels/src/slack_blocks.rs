//! Slack Block Kit Builder
//!
//! The summary is already Markdown, so it goes out as a single `markdown`
//! block, which Slack renders with standard Markdown syntax (not `mrkdwn`).

use serde_json::{json, Value};

/// A `markdown` block holding `text`.
pub fn markdown_block(text: &str) -> Value {
    json!({ "type": "markdown", "text": text })
}

/// `chat.postMessage` payload. `text` doubles as the notification fallback.
pub fn post_message_body(channel: &str, markdown: &str) -> Value {
    json!({
        "channel": channel,
        "text": markdown,
        "blocks": [markdown_block(markdown)],
    })
}
