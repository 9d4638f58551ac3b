//! Page Control Actions
//!
//! A single page target attached through a flattened CDP session: navigation,
//! script evaluation, layout metrics and screenshots.

use std::time::Duration;

use anyhow::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use restabot_core::RestabotError;
use serde_json::{json, Value};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::cdp_client::CdpClient;

/// Chromium refuses to rasterize surfaces taller than this.
pub const MAX_CAPTURE_HEIGHT: f64 = 16384.0;

pub struct PageControl<'a> {
    client: &'a CdpClient,
    target_id: String,
    session_id: String,
}

impl<'a> PageControl<'a> {
    /// Creates a blank tab and attaches to it.
    pub async fn open(client: &'a CdpClient) -> Result<PageControl<'a>> {
        let created = client
            .send_command("Target.createTarget", json!({ "url": "about:blank" }), None)
            .await?;
        let target_id = string_field(&created, "targetId")?;

        let attached = client
            .send_command(
                "Target.attachToTarget",
                json!({ "targetId": target_id, "flatten": true }),
                None,
            )
            .await?;
        let session_id = string_field(&attached, "sessionId")?;
        debug!(%target_id, %session_id, "Attached to page");

        let page = Self {
            client,
            target_id,
            session_id,
        };
        page.command("Page.enable", json!({})).await?;
        Ok(page)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub async fn command(&self, method: &str, params: Value) -> Result<Value> {
        self.client
            .send_command(method, params, Some(&self.session_id))
            .await
    }

    /// Navigates and waits for the load event.
    ///
    /// A page that never fires `load` within `timeout` is still captured as-is.
    pub async fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        info!("Navigating browser tab to {}", url);
        let mut events = self.client.subscribe();

        let result = self.command("Page.navigate", json!({ "url": url })).await?;
        if let Some(error) = result.get("errorText").and_then(Value::as_str) {
            return Err(RestabotError::Browser(format!("navigation to {url} failed: {error}")).into());
        }

        let wait_for_load = async {
            loop {
                match events.recv().await {
                    Ok(event)
                        if event.method == "Page.loadEventFired"
                            && event.session_id.as_deref() == Some(self.session_id.as_str()) =>
                    {
                        return true;
                    }
                    Ok(_) | Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => return false,
                }
            }
        };
        match tokio::time::timeout(timeout, wait_for_load).await {
            Ok(true) => debug!(url, "Page loaded"),
            Ok(false) => {
                return Err(RestabotError::Browser("connection closed during navigation".into()).into())
            }
            Err(_) => warn!(url, "Load event not received within {:?}, continuing", timeout),
        }
        Ok(())
    }

    /// Evaluates a JS expression and returns its value by value.
    pub async fn evaluate(&self, expression: &str) -> Result<Value> {
        debug!("Evaluating JS payload of length {}", expression.len());
        let result = self
            .command(
                "Runtime.evaluate",
                json!({ "expression": expression, "returnByValue": true, "awaitPromise": true }),
            )
            .await?;
        if let Some(details) = result.get("exceptionDetails") {
            let text = details
                .pointer("/exception/description")
                .or_else(|| details.get("text"))
                .and_then(Value::as_str)
                .unwrap_or("script threw");
            return Err(RestabotError::Browser(format!("evaluation failed: {text}")).into());
        }
        Ok(result
            .pointer("/result/value")
            .cloned()
            .unwrap_or(Value::Null))
    }

    /// Full document size in CSS pixels.
    pub async fn content_size(&self) -> Result<(f64, f64)> {
        let metrics = self.command("Page.getLayoutMetrics", json!({})).await?;
        content_size_from_metrics(&metrics)
    }

    /// Screenshot of the whole document, clipped to [`MAX_CAPTURE_HEIGHT`].
    pub async fn capture_full_page(&self, format: &str, quality: Option<u8>) -> Result<Vec<u8>> {
        let (width, height) = self.content_size().await?;
        let height = height.min(MAX_CAPTURE_HEIGHT);
        debug!(width, height, "Capturing full page");

        let mut params = json!({
            "format": format,
            "captureBeyondViewport": true,
            "clip": { "x": 0, "y": 0, "width": width, "height": height, "scale": 1 },
        });
        if let Some(q) = quality {
            params["quality"] = json!(q);
        }
        let shot = self.command("Page.captureScreenshot", params).await?;
        let data = string_field(&shot, "data")?;
        Ok(STANDARD
            .decode(data)
            .map_err(|e| RestabotError::Browser(format!("invalid screenshot payload: {e}")))?)
    }

    pub async fn close(self) -> Result<()> {
        self.client
            .send_command(
                "Target.closeTarget",
                json!({ "targetId": self.target_id }),
                None,
            )
            .await?;
        Ok(())
    }
}

fn string_field(value: &Value, key: &str) -> Result<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| RestabotError::Browser(format!("response missing `{key}`")).into())
}

/// Prefers `cssContentSize`, which newer Chromium reports in CSS pixels.
pub(crate) fn content_size_from_metrics(metrics: &Value) -> Result<(f64, f64)> {
    let size = metrics
        .get("cssContentSize")
        .or_else(|| metrics.get("contentSize"))
        .ok_or_else(|| RestabotError::Browser("layout metrics missing content size".into()))?;
    let width = size.get("width").and_then(Value::as_f64).unwrap_or(0.0);
    let height = size.get("height").and_then(Value::as_f64).unwrap_or(0.0);
    if width <= 0.0 || height <= 0.0 {
        return Err(RestabotError::Browser(format!("empty page ({width}x{height})")).into());
    }
    Ok((width.ceil(), height.ceil()))
}
