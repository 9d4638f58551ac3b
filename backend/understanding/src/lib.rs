//! Menu understanding: the Gemini client and the two model-backed stages.
//!
//! OCR turns menu images into structured [`ParsedMenu`](restabot_core::ParsedMenu)s;
//! the summary stage turns those into one Czech Markdown digest for the day.

pub mod gemini;
pub mod mock;
pub mod ocr;
pub mod summary;

pub use gemini::GeminiClient;
pub use mock::MockModel;
pub use ocr::{find_image, ocr_captured_task, ocr_task, parsed_menu_schema, OCR_PROMPT};
pub use summary::{
    daily_summary_schema, read_ocr_output, summary_prompt, summary_task, NO_MENUS_TEXT,
};
