//! Channel download stage: the newest menu photo of each `slack://` restaurant.

use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use restabot_config::{ensure_output_dir, write_image};
use restabot_core::{parallel_process, Restaurant, ScreenshotResult, ScreenshotTaskOutput, SourceRef};
use restabot_logging::redact_sensitive_data;
use tracing::{info, warn};

use crate::ChannelAdapter;

/// Photos older than this are not considered.
pub const LOOKBACK_HOURS: i64 = 24;

/// Download the newest image posted in each restaurant's channel.
///
/// Only restaurants with a `slack://<channel>` source are processed. Files are
/// saved as `<out_dir>/<id>.<ext>`. Per-restaurant failures go to `errors`.
pub async fn slack_download_task(
    adapter: &dyn ChannelAdapter,
    restaurants: &[Restaurant],
    out_dir: &Path,
    max_concurrency: usize,
) -> Result<ScreenshotTaskOutput> {
    download_since(adapter, restaurants, out_dir, max_concurrency, Utc::now()).await
}

pub(crate) async fn download_since(
    adapter: &dyn ChannelAdapter,
    restaurants: &[Restaurant],
    out_dir: &Path,
    max_concurrency: usize,
    now: DateTime<Utc>,
) -> Result<ScreenshotTaskOutput> {
    let out_dir = ensure_output_dir(out_dir).await?;
    let since = now - Duration::hours(LOOKBACK_HOURS);
    let sites: Vec<(&Restaurant, String)> = restaurants
        .iter()
        .filter_map(|r| match r.source() {
            SourceRef::Slack { channel } => Some((r, channel)),
            _ => None,
        })
        .collect();

    let out_dir = &out_dir;
    let outcomes = parallel_process(sites, max_concurrency, |(restaurant, channel)| async move {
        let outcome = async {
            info!("Downloading last image from {} channel {}", adapter.name(), channel);
            let file = adapter.latest_file(&channel, since).await?;
            let bytes = adapter.download(&file).await?;
            let path = write_image(out_dir, &restaurant.id, &file.extension(), &bytes).await?;
            info!("Successfully downloaded a photo to '{}'", path.display());
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
                "Channel download failed"
            );
        }
        (restaurant.id.clone(), outcome)
    })
    .await;

    Ok(ScreenshotTaskOutput::from_outcomes(outcomes))
}
