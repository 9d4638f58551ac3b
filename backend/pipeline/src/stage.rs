use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    #[default]
    Capture,
    Ocr,
    Summary,
    Publish,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Capture, Stage::Ocr, Stage::Summary, Stage::Publish];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Capture => "capture",
            Stage::Ocr => "ocr",
            Stage::Summary => "summary",
            Stage::Publish => "publish",
        }
    }

    /// Whether a run starting at `start_from` executes this stage.
    pub fn runs_from(self, start_from: Stage) -> bool {
        self >= start_from
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown stage `{s}` (expected capture, ocr, summary or publish)"))
    }
}
