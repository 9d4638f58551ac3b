//! The restabot coordinator: capture → OCR → summary → publish.

pub mod artifacts;
pub mod pipeline;
pub mod stage;

pub use artifacts::{read_summary, write_json, write_text};
pub use pipeline::{Pipeline, PipelineConfig, PipelineReport};
pub use stage::Stage;
