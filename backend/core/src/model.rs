//! Domain model shared by every pipeline stage.
//!
//! Task outputs are the artifacts the stages hand to each other, so they are
//! serde-serializable: the OCR output is persisted as JSON and read back by
//! the summary stage.

use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One restaurant entry from the sites file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: String,
    pub name: String,
    /// Source reference: a web URL or `slack://<channel-id>`.
    pub url: String,
}

impl Restaurant {
    pub fn new(id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
        }
    }

    pub fn source(&self) -> SourceRef {
        SourceRef::parse(&self.url)
    }
}

/// Where a restaurant's menu image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRef {
    /// A web page rendered by the headless browser.
    Web(String),
    /// The most recent image posted to a Slack channel.
    Slack { channel: String },
    Unsupported(String),
}

pub const SLACK_SCHEME: &str = "slack://";

impl SourceRef {
    pub fn parse(url: &str) -> Self {
        let url = url.trim();
        if let Some(channel) = url.strip_prefix(SLACK_SCHEME) {
            return Self::Slack {
                channel: channel.trim_end_matches('/').to_string(),
            };
        }
        let lower = url.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Self::Web(url.to_string())
        } else {
            Self::Unsupported(url.to_string())
        }
    }

    pub fn is_web(&self) -> bool {
        matches!(self, Self::Web(_))
    }

    pub fn is_slack(&self) -> bool {
        matches!(self, Self::Slack { .. })
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Web(url) | Self::Unsupported(url) => f.write_str(url),
            Self::Slack { channel } => write!(f, "{SLACK_SCHEME}{channel}"),
        }
    }
}

/// A per-restaurant failure. Stages collect these instead of aborting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResult {
    pub id: String,
    pub error: String,
}

impl ErrorResult {
    pub fn new(id: impl Into<String>, error: impl fmt::Display) -> Self {
        Self {
            id: id.into(),
            error: error.to_string(),
        }
    }
}

/// An image stored on disk for a restaurant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenshotResult {
    pub id: String,
    pub path: PathBuf,
}

/// Successful results and per-item errors of a batch stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOutput<T> {
    pub results: Vec<T>,
    pub errors: Vec<ErrorResult>,
}

impl<T> Default for TaskOutput<T> {
    fn default() -> Self {
        Self {
            results: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl<T> TaskOutput<T> {
    /// Split `(id, result)` pairs into successes and failures, keeping order.
    pub fn from_outcomes<I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = (String, anyhow::Result<T>)>,
    {
        let mut output = Self::default();
        for (id, outcome) in outcomes {
            match outcome {
                Ok(result) => output.results.push(result),
                Err(e) => output.errors.push(ErrorResult::new(id, format!("{e:#}"))),
            }
        }
        output
    }

    pub fn extend(&mut self, other: TaskOutput<T>) {
        self.results.extend(other.results);
        self.errors.extend(other.errors);
    }
}

/// Output of the screenshot and channel download stages.
pub type ScreenshotTaskOutput = TaskOutput<ScreenshotResult>;

/// A single dish as read from a menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dish {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Price as printed, e.g. `"149"` or `"149 Kč"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    /// Soup, main course, dessert, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// The menu for one day (or a whole week when `whole_week` is set).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyMenu {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_week: Option<String>,
    #[serde(default)]
    pub whole_week: bool,
    #[serde(default)]
    pub dishes: Vec<Dish>,
}

/// Structured OCR result for one image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedMenu {
    #[serde(default)]
    pub daily_menus: Vec<DailyMenu>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrResult {
    pub id: String,
    pub data: ParsedMenu,
}

/// The persisted OCR artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrTaskOutput {
    pub results: Vec<OcrResult>,
    pub errors: Vec<ErrorResult>,
    pub date: NaiveDate,
}

/// Model output of the summary stage. `reasoning` is kept for debugging only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    #[serde(default)]
    pub reasoning: String,
    pub text: String,
}

impl DailySummary {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            reasoning: String::new(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryTaskOutput {
    pub summary: DailySummary,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlackUploadTaskOutput {
    pub error: Option<String>,
}
