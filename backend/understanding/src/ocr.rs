//! OCR stage: menu images in, structured daily menus out.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde_json::{json, Value};
use tracing::{info, warn};

use restabot_core::mime::IMAGE_EXTENSIONS;
use restabot_core::{
    detect_mime_type, parallel_process, GenerateRequest, GenerativeModel, OcrResult, OcrTaskOutput,
    ParsedMenu, Part, Restaurant, RestabotError, ScreenshotResult, TaskOutput,
};
use restabot_logging::redact_sensitive_data;

pub const OCR_PROMPT: &str = "Extract restaurant daily menus from the image. \
The texts are in Czech or English language. \
The input is either a screenshot of a webpage or a photo of a handwritten menu; \
it can contain spelling errors. \
Ignore any text not related to the menu.";

/// Response schema matching [`ParsedMenu`], in Gemini's OpenAPI subset.
pub fn parsed_menu_schema() -> Value {
    let dish = json!({
        "type": "OBJECT",
        "properties": {
            "name": { "type": "STRING" },
            "description": { "type": "STRING", "nullable": true },
            "price": { "type": "STRING", "nullable": true },
            "category": { "type": "STRING", "nullable": true },
        },
        "required": ["name"],
        "propertyOrdering": ["name", "description", "price", "category"],
    });
    let daily_menu = json!({
        "type": "OBJECT",
        "properties": {
            "date": { "type": "STRING", "nullable": true, "description": "ISO date (YYYY-MM-DD) if known" },
            "day_of_week": { "type": "STRING", "nullable": true },
            "whole_week": { "type": "BOOLEAN" },
            "dishes": { "type": "ARRAY", "items": dish },
        },
        "required": ["whole_week", "dishes"],
        "propertyOrdering": ["date", "day_of_week", "whole_week", "dishes"],
    });
    json!({
        "type": "OBJECT",
        "properties": {
            "daily_menus": { "type": "ARRAY", "items": daily_menu },
        },
        "required": ["daily_menus"],
    })
}

/// First `<dir>/<id>.<ext>` that exists, trying extensions in lookup order.
pub async fn find_image(dir: &Path, id: &str) -> Option<PathBuf> {
    for ext in IMAGE_EXTENSIONS {
        let candidate = dir.join(format!("{id}.{ext}"));
        if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
            return Some(candidate);
        }
    }
    None
}

async fn ocr_one(
    model: &dyn GenerativeModel,
    in_dir: &Path,
    captured: Option<&Path>,
    restaurant: &Restaurant,
) -> Result<OcrResult> {
    let path = match captured {
        Some(path) => path.to_path_buf(),
        None => find_image(in_dir, &restaurant.id)
            .await
            .ok_or_else(|| RestabotError::MissingImage(format!("{} in {}", restaurant.id, in_dir.display())))?,
    };
    let bytes = tokio::fs::read(&path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    info!("Running OCR for {}", restaurant.id);

    let request = GenerateRequest::new(vec![
        Part::image(detect_mime_type(&path), bytes),
        Part::text(OCR_PROMPT),
    ])
    .with_schema(parsed_menu_schema());
    let response = model.generate(&request).await?;

    let data: ParsedMenu = serde_json::from_str(&response.text)
        .map_err(|e| RestabotError::UnexpectedResponse(format!("menu is not valid JSON: {e}")))?;
    info!(
        id = %restaurant.id,
        menus = data.daily_menus.len(),
        tokens = response.tokens_used,
        "OCR finished"
    );
    Ok(OcrResult {
        id: restaurant.id.clone(),
        data,
    })
}

/// Run OCR over every restaurant's image in `in_dir`.
///
/// Results keep the order of `restaurants`. Each failure (missing image,
/// model error, unparsable answer) becomes an entry in `errors`.
pub async fn ocr_task(
    model: &dyn GenerativeModel,
    restaurants: &[Restaurant],
    in_dir: &Path,
    date: NaiveDate,
    max_concurrency: usize,
) -> OcrTaskOutput {
    ocr_captured_task(model, restaurants, in_dir, &[], date, max_concurrency).await
}

/// Like [`ocr_task`], but restaurants present in `captured` are read from the
/// path the capture produced instead of being looked up in `in_dir`.
pub async fn ocr_captured_task(
    model: &dyn GenerativeModel,
    restaurants: &[Restaurant],
    in_dir: &Path,
    captured: &[ScreenshotResult],
    date: NaiveDate,
    max_concurrency: usize,
) -> OcrTaskOutput {
    let captured: HashMap<&str, &Path> = captured
        .iter()
        .map(|c| (c.id.as_str(), c.path.as_path()))
        .collect();
    let captured = &captured;
    let outcomes = parallel_process(restaurants, max_concurrency, |restaurant| async move {
        let image = captured.get(restaurant.id.as_str()).copied();
        let outcome = ocr_one(model, in_dir, image, restaurant).await;
        if let Err(e) = &outcome {
            warn!(
                id = %restaurant.id,
                error = %redact_sensitive_data(&format!("{e:#}")),
                "Failed to extract menu"
            );
        }
        (restaurant.id.clone(), outcome)
    })
    .await;

    let TaskOutput { results, errors } = TaskOutput::from_outcomes(outcomes);
    OcrTaskOutput {
        results,
        errors,
        date,
    }
}
