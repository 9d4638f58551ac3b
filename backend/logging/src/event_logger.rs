//! Pipeline Event Logger
//!
//! Structured stage events written as JSON under the `pipeline_events` target,
//! so a rolling NDJSON log can be filtered per run.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::redact::redact_sensitive_data;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    StageStarted {
        stage: String,
    },
    StageFinished {
        stage: String,
        succeeded: usize,
        failed: usize,
    },
    RestaurantFailed {
        stage: String,
        restaurant_id: String,
        error: String,
    },
    ArtifactWritten {
        path: String,
    },
}

#[derive(Debug, Serialize)]
pub struct EventLogEntry {
    pub run_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event: PipelineEvent,
}

pub struct EventLogger;

impl EventLogger {
    /// Logs a pipeline event, redacting free-form error text first.
    pub fn log_event(run_id: Uuid, mut event: PipelineEvent) {
        if let PipelineEvent::RestaurantFailed { error, .. } = &mut event {
            *error = redact_sensitive_data(error);
        }
        let failure = matches!(event, PipelineEvent::RestaurantFailed { .. });

        let entry = EventLogEntry {
            run_id,
            timestamp: Utc::now(),
            event,
        };
        let json = serde_json::to_string(&entry).unwrap_or_default();

        if failure {
            warn!(target: "pipeline_events", event = %json, "Pipeline event");
        } else {
            info!(target: "pipeline_events", event = %json, "Pipeline event");
        }
    }
}
