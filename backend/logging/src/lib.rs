//! Structured logging for the restabot pipeline.
//!
//! Handles secret redaction, console and rolling NDJSON output, and pipeline event logging.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{EventLogEntry, EventLogger, PipelineEvent};
pub use logger::{init_logger, LogGuard};
pub use redact::redact_sensitive_data;
