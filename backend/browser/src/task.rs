//! Screenshot stage: capture every web-sourced restaurant into a directory.

use std::path::Path;

use anyhow::Result;
use restabot_config::{ensure_output_dir, write_image};
use restabot_core::{parallel_process, Restaurant, ScreenshotResult, ScreenshotTaskOutput, SourceRef};
use restabot_logging::redact_sensitive_data;
use tracing::{info, warn};

use crate::screenshot::{CaptureOptions, PageCapturer};

/// Captures web pages with at most `max_concurrency` browsers at a time.
///
/// Restaurants with non-web sources are skipped. A failed capture is recorded
/// in `errors`; only an unusable output directory fails the whole stage.
pub async fn screenshot_task(
    capturer: &dyn PageCapturer,
    restaurants: &[Restaurant],
    out_dir: &Path,
    options: &CaptureOptions,
    max_concurrency: usize,
) -> Result<ScreenshotTaskOutput> {
    let out_dir = ensure_output_dir(out_dir).await?;
    let sites: Vec<(&Restaurant, String)> = restaurants
        .iter()
        .filter_map(|r| match r.source() {
            SourceRef::Web(url) => Some((r, url)),
            _ => None,
        })
        .collect();
    info!("Capturing {} web pages into {}", sites.len(), out_dir.display());

    let out_dir = &out_dir;
    let outcomes = parallel_process(sites, max_concurrency, |(restaurant, url)| async move {
        let outcome = async {
            let bytes = capturer.capture(&url, options).await?;
            let path = write_image(out_dir, &restaurant.id, options.format.extension(), &bytes).await?;
            info!(id = %restaurant.id, path = %path.display(), "Screenshot saved");
            Ok::<_, anyhow::Error>(ScreenshotResult {
                id: restaurant.id.clone(),
                path,
            })
        }
        .await;
        if let Err(e) = &outcome {
            warn!(
                id = %restaurant.id,
                error = %redact_sensitive_data(&format!("{e:#}")),
                "Screenshot failed"
            );
        }
        (restaurant.id.clone(), outcome)
    })
    .await;

    Ok(ScreenshotTaskOutput::from_outcomes(outcomes))
}
