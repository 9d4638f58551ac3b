pub mod error;
pub mod mime;
pub mod model;
pub mod parallel;
pub mod retry;
pub mod traits;

pub use error::RestabotError;
pub use mime::{detect_mime_type, extension_for_mime, is_image};
pub use model::{
    DailyMenu, DailySummary, Dish, ErrorResult, OcrResult, OcrTaskOutput, ParsedMenu, Restaurant,
    ScreenshotResult, ScreenshotTaskOutput, SlackUploadTaskOutput, SourceRef, SummaryTaskOutput,
    TaskOutput,
};
pub use parallel::parallel_process;
pub use retry::{retry_async, RetryPolicy};
pub use traits::{GenerateRequest, GenerateResponse, GenerativeModel, Part};
