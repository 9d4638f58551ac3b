//! Construction of the external services from runtime settings.

use anyhow::Result;

use restabot_browser::{BrowserLauncher, ChromeCapturer};
use restabot_channels::SlackClient;
use restabot_config::Settings;
use restabot_understanding::GeminiClient;

pub fn gemini(settings: &Settings) -> Result<GeminiClient> {
    let key = settings.require_gemini_key()?;
    Ok(GeminiClient::new(key)
        .with_base_url(&settings.gemini_base_url)
        .with_model(&settings.model))
}

pub fn slack(settings: &Settings) -> Result<SlackClient> {
    let token = settings.require_slack_token()?;
    Ok(SlackClient::new(token).with_base_url(&settings.slack_api_url))
}

/// Slack client when a bot token is configured.
pub fn optional_slack(settings: &Settings) -> Option<SlackClient> {
    slack(settings).ok()
}

pub fn launcher(settings: &Settings) -> Result<BrowserLauncher> {
    BrowserLauncher::detect(settings.chrome_path.as_deref())
}

pub fn chrome(settings: &Settings) -> Result<ChromeCapturer> {
    Ok(ChromeCapturer::new(launcher(settings)?))
}
