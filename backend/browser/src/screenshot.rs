//! Full-page Screenshot Capture
//!
//! One throwaway browser per page: launch, navigate, dismiss the cookie
//! banner, capture, close.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::cdp_client::CdpClient;
use crate::element_query::ElementQuery;
use crate::launcher::BrowserLauncher;
use crate::page_control::PageControl;

const SETTLE_AFTER_LOAD: Duration = Duration::from_millis(300);
const SETTLE_AFTER_CONSENT: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ImageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            other => Err(format!("unsupported image format `{other}` (expected png or jpeg)")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureOptions {
    pub format: ImageFormat,
    /// 1-100, jpeg only.
    pub quality: Option<u8>,
}

impl CaptureOptions {
    pub fn jpeg(quality: u8) -> Self {
        Self {
            format: ImageFormat::Jpeg,
            quality: Some(quality),
        }
    }

    /// Quality as sent to the browser: clamped, and dropped for png.
    pub fn effective_quality(&self) -> Option<u8> {
        match self.format {
            ImageFormat::Jpeg => self.quality.map(|q| q.clamp(1, 100)),
            ImageFormat::Png => None,
        }
    }
}

/// Renders a URL into image bytes.
#[async_trait]
pub trait PageCapturer: Send + Sync {
    async fn capture(&self, url: &str, options: &CaptureOptions) -> Result<Vec<u8>>;
}

pub struct ChromeCapturer {
    launcher: BrowserLauncher,
    navigation_timeout: Duration,
}

impl ChromeCapturer {
    pub fn new(launcher: BrowserLauncher) -> Self {
        Self {
            launcher,
            navigation_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    async fn capture_with(
        &self,
        client: &CdpClient,
        url: &str,
        options: &CaptureOptions,
    ) -> Result<Vec<u8>> {
        let page = PageControl::open(client).await?;
        page.navigate(url, self.navigation_timeout).await?;
        tokio::time::sleep(SETTLE_AFTER_LOAD).await;

        if let Err(e) = ElementQuery::accept_cookies(&page).await {
            debug!(url, error = %e, "Cookie banner handling failed, ignoring");
        }
        tokio::time::sleep(SETTLE_AFTER_CONSENT).await;

        page.capture_full_page(options.format.extension(), options.effective_quality())
            .await
    }
}

#[async_trait]
impl PageCapturer for ChromeCapturer {
    async fn capture(&self, url: &str, options: &CaptureOptions) -> Result<Vec<u8>> {
        info!("Capturing {}", url);
        let browser = self.launcher.launch().await?;
        let outcome = match CdpClient::connect(browser.ws_endpoint()).await {
            Ok(client) => {
                let shot = self.capture_with(&client, url, options).await;
                if let Err(e) = client.send_command("Browser.close", json!({}), None).await {
                    // The browser often drops the socket before answering.
                    debug!(error = %e, "Browser.close did not complete cleanly");
                }
                shot
            }
            Err(e) => Err(e),
        };
        browser.shutdown(Duration::from_secs(5)).await;

        if let Err(e) = &outcome {
            warn!(url, error = %e, "Capture failed");
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_formats() {
        assert_eq!("png".parse::<ImageFormat>().unwrap(), ImageFormat::Png);
        assert_eq!("JPEG".parse::<ImageFormat>().unwrap(), ImageFormat::Jpeg);
        assert_eq!("jpg".parse::<ImageFormat>().unwrap(), ImageFormat::Jpeg);
        assert!("gif".parse::<ImageFormat>().is_err());
    }

    #[test]
    fn quality_applies_to_jpeg_only() {
        assert_eq!(CaptureOptions::jpeg(90).effective_quality(), Some(90));
        assert_eq!(CaptureOptions::jpeg(0).effective_quality(), Some(1));
        let png = CaptureOptions {
            format: ImageFormat::Png,
            quality: Some(50),
        };
        assert_eq!(png.effective_quality(), None);
    }

    #[test]
    fn default_is_png() {
        let options = CaptureOptions::default();
        assert_eq!(options.format.extension(), "png");
        assert_eq!(options.quality, None);
    }

    #[tokio::test]
    async fn capture_fails_without_browser() {
        let capturer = ChromeCapturer::new(BrowserLauncher::new("/nonexistent/chromium"));
        let result = capturer
            .capture("https://example.com", &CaptureOptions::default())
            .await;
        assert!(result.is_err());
    }
}
