use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_SLACK_API_URL: &str = "https://slack.com/api";
pub const DEFAULT_MAX_CONCURRENCY: usize = 5;

/// Runtime settings, read from the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Gemini API key
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: String,
    /// Model used for OCR and summaries
    pub model: String,

    // Slack
    pub slack_bot_token: Option<String>,
    pub slack_channel_id: Option<String>,
    pub slack_api_url: String,

    /// Explicit browser executable; otherwise searched on PATH
    pub chrome_path: Option<String>,
    /// Concurrent screenshots / OCR requests
    pub max_concurrency: usize,

    /// Log level
    pub log_level: String,
    /// Directory for rolling NDJSON logs
    pub log_dir: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            slack_bot_token: None,
            slack_channel_id: None,
            slack_api_url: DEFAULT_SLACK_API_URL.to_string(),
            chrome_path: None,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl Settings {
    /// Load settings from environment variables with sensible defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read `.env` from the working directory when present, then the environment.
    /// Variables already set in the process keep their values.
    pub fn load() -> Self {
        dotenv::dotenv().ok();
        Self::from_env()
    }

    /// Load settings through an arbitrary lookup (useful for testing).
    /// Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Self {
            gemini_api_key: get("GEMINI_API_KEY"),
            gemini_base_url: get("GEMINI_BASE_URL").unwrap_or(defaults.gemini_base_url),
            model: get("RESTABOT_MODEL").unwrap_or(defaults.model),
            slack_bot_token: get("SLACK_BOT_TOKEN"),
            slack_channel_id: get("SLACK_CHANNEL_ID"),
            slack_api_url: get("SLACK_API_URL").unwrap_or(defaults.slack_api_url),
            chrome_path: get("CHROME_PATH"),
            max_concurrency: get("RESTABOT_MAX_CONCURRENCY")
                .and_then(|v| v.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.max_concurrency),
            log_level: get("RUST_LOG").unwrap_or(defaults.log_level),
            log_dir: get("RESTABOT_LOG_DIR"),
        }
    }

    pub fn require_gemini_key(&self) -> Result<&str> {
        match self.gemini_api_key.as_deref() {
            Some(key) => Ok(key),
            None => bail!("GEMINI_API_KEY is not set"),
        }
    }

    pub fn require_slack_token(&self) -> Result<&str> {
        match self.slack_bot_token.as_deref() {
            Some(token) => Ok(token),
            None => bail!("SLACK_BOT_TOKEN is not set"),
        }
    }

    /// Channel from the command line, falling back to `SLACK_CHANNEL_ID`.
    pub fn resolve_channel(&self, explicit: Option<&str>) -> Result<String> {
        match explicit.or(self.slack_channel_id.as_deref()) {
            Some(channel) if !channel.trim().is_empty() => Ok(channel.to_string()),
            _ => bail!(
                "Slack channel ID is not set. Either pass it as an argument \
                 or set the SLACK_CHANNEL_ID environment variable."
            ),
        }
    }
}

/// Export the variables of a dotenv file into the process environment.
/// Variables already set keep their values.
pub fn load_env_file(path: &Path) -> Result<()> {
    dotenv::from_path(path)
        .with_context(|| format!("Failed to load environment file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Settings {
        let env: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|k| env.get(k).cloned())
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let s = settings(&[]);
        assert_eq!(s.model, DEFAULT_MODEL);
        assert_eq!(s.max_concurrency, 5);
        assert_eq!(s.slack_api_url, "https://slack.com/api");
        assert!(s.require_gemini_key().is_err());
    }

    #[test]
    fn reads_overrides() {
        let s = settings(&[
            ("GEMINI_API_KEY", "AIza-test"),
            ("RESTABOT_MODEL", "gemini-2.0-flash"),
            ("RESTABOT_MAX_CONCURRENCY", "2"),
            ("SLACK_BOT_TOKEN", "xoxb-1"),
        ]);
        assert_eq!(s.require_gemini_key().unwrap(), "AIza-test");
        assert_eq!(s.model, "gemini-2.0-flash");
        assert_eq!(s.max_concurrency, 2);
        assert_eq!(s.require_slack_token().unwrap(), "xoxb-1");
    }

    #[test]
    fn invalid_concurrency_falls_back() {
        assert_eq!(settings(&[("RESTABOT_MAX_CONCURRENCY", "0")]).max_concurrency, 5);
        assert_eq!(settings(&[("RESTABOT_MAX_CONCURRENCY", "lots")]).max_concurrency, 5);
    }

    #[test]
    fn explicit_channel_wins_over_env() {
        let s = settings(&[("SLACK_CHANNEL_ID", "C-env")]);
        assert_eq!(s.resolve_channel(Some("C-cli")).unwrap(), "C-cli");
        assert_eq!(s.resolve_channel(None).unwrap(), "C-env");
        assert!(settings(&[]).resolve_channel(None).is_err());
    }

    #[test]
    fn env_file_fills_unset_variables_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(
            &path,
            "RESTABOT_TEST_DOTENV_FRESH=from-file\nRESTABOT_TEST_DOTENV_KEPT=from-file\n",
        )
        .unwrap();
        std::env::set_var("RESTABOT_TEST_DOTENV_KEPT", "from-process");

        load_env_file(&path).unwrap();

        assert_eq!(std::env::var("RESTABOT_TEST_DOTENV_FRESH").unwrap(), "from-file");
        assert_eq!(std::env::var("RESTABOT_TEST_DOTENV_KEPT").unwrap(), "from-process");
    }

    #[test]
    fn missing_env_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_env_file(&dir.path().join("absent.env")).unwrap_err();
        assert!(err.to_string().starts_with("Failed to load environment file"));
    }
}
