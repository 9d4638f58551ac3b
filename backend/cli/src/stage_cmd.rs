//! One subcommand per pipeline stage.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::info;

use restabot_browser::{screenshot_task, CaptureOptions, ImageFormat};
use restabot_channels::{slack_download_task, slack_upload_task};
use restabot_config::{load_restaurants, Settings};
use restabot_pipeline::{read_summary, write_json, write_text};
use restabot_understanding::{ocr_task, read_ocr_output, summary_task};

use crate::backends;
use crate::terminal_output::{note_error, note_success, note_warn};

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize task output")?;
    println!("{json}");
    Ok(())
}

pub async fn screenshot(
    settings: &Settings,
    sites: &Path,
    out_dir: &Path,
    format: ImageFormat,
    quality: Option<u8>,
) -> Result<ExitCode> {
    let restaurants = load_restaurants(sites).await?;
    let capturer = backends::chrome(settings)?;
    let options = CaptureOptions { format, quality };

    let output = screenshot_task(
        &capturer,
        &restaurants,
        out_dir,
        &options,
        settings.max_concurrency,
    )
    .await?;
    print_json(&output)?;
    Ok(ExitCode::SUCCESS)
}

pub async fn slack_download(settings: &Settings, sites: &Path, out_dir: &Path) -> Result<ExitCode> {
    let restaurants = load_restaurants(sites).await?;
    let slack = backends::slack(settings)?;

    let output = slack_download_task(&slack, &restaurants, out_dir, settings.max_concurrency).await?;
    print_json(&output)?;
    Ok(ExitCode::SUCCESS)
}

pub async fn ocr(
    settings: &Settings,
    sites: &Path,
    in_dir: &Path,
    out_file: &Path,
    date: Option<NaiveDate>,
) -> Result<ExitCode> {
    let restaurants = load_restaurants(sites).await?;
    let model = backends::gemini(settings)?;
    let date = date.unwrap_or_else(today);

    let output = ocr_task(&model, &restaurants, in_dir, date, settings.max_concurrency).await;
    for error in &output.errors {
        note_warn(&format!("{}: {}", error.id, error.error));
    }
    write_json(out_file, &output).await?;
    note_success(&format!(
        "Extracted {} menus, wrote {}",
        output.results.len(),
        out_file.display()
    ));
    Ok(ExitCode::SUCCESS)
}

pub async fn summary(
    settings: &Settings,
    sites: &Path,
    ocr_output: &Path,
    out_file: &Path,
) -> Result<ExitCode> {
    let restaurants = load_restaurants(sites).await?;
    let model = backends::gemini(settings)?;
    let ocr = read_ocr_output(ocr_output).await?;

    let output = summary_task(&model, &restaurants, &ocr).await;
    write_text(out_file, &output.summary.text).await?;
    note_success(&format!("Summary for {} written to {}", output.date, out_file.display()));
    Ok(ExitCode::SUCCESS)
}

pub async fn slack_upload(
    settings: &Settings,
    sites: &Path,
    summary_file: &Path,
    channel_id: Option<&str>,
) -> Result<ExitCode> {
    // Validates the sites file even though the upload does not need it.
    load_restaurants(sites).await?;
    let channel = settings.resolve_channel(channel_id)?;
    let slack = backends::slack(settings)?;
    let summary = read_summary(summary_file).await?;

    let output = slack_upload_task(&slack, &channel, &summary).await;
    match output.error {
        Some(error) => {
            note_error(&error);
            Ok(ExitCode::FAILURE)
        }
        None => {
            info!(channel = %channel, "Summary published");
            note_success(&format!("Posted summary to {channel}"));
            Ok(ExitCode::SUCCESS)
        }
    }
}
