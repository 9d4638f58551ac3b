//! `restabot run`: the whole pipeline in one process.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use tracing::{info, warn};

use restabot_browser::{BrowserLauncher, ChromeCapturer};
use restabot_config::{load_restaurants, Settings};
use restabot_pipeline::{Pipeline, PipelineConfig, PipelineReport, Stage};
use restabot_understanding::GeminiClient;

use crate::backends;
use crate::stage_cmd::today;
use crate::terminal_output::{note_error, note_info, note_success, note_warn, render_table, Column};

pub struct RunArgs {
    pub sites: PathBuf,
    pub screenshots_dir: PathBuf,
    pub ocr_output: PathBuf,
    pub summary_output: PathBuf,
    pub date: Option<NaiveDate>,
    pub start_from: Stage,
    pub channel_id: Option<String>,
    pub no_publish: bool,
}

/// Channel to publish to, or `None` when publishing is off or unconfigured.
fn publish_channel(settings: &Settings, args: &RunArgs) -> Option<String> {
    if args.no_publish {
        return None;
    }
    settings.resolve_channel(args.channel_id.as_deref()).ok()
}

/// Why `run` will not publish, or `None` when it will.
fn publish_skip_reason(settings: &Settings, args: &RunArgs) -> Option<&'static str> {
    if args.no_publish {
        Some("--no-publish given")
    } else if publish_channel(settings, args).is_none() {
        Some("no Slack channel configured (pass --channel-id or set SLACK_CHANNEL_ID)")
    } else {
        None
    }
}

/// Skipping is a warning when nothing else runs or nobody asked for it.
fn skip_is_warning(args: &RunArgs) -> bool {
    args.start_from == Stage::Publish || !args.no_publish
}

fn pipeline_config(settings: &Settings, args: &RunArgs) -> PipelineConfig {
    let config = PipelineConfig::new(
        &args.screenshots_dir,
        &args.ocr_output,
        &args.summary_output,
        args.date.unwrap_or_else(today),
    )
    .with_start_from(args.start_from)
    .with_max_concurrency(settings.max_concurrency);

    match publish_channel(settings, args) {
        Some(channel) => config.with_publish_channel(channel),
        None => config,
    }
}

fn build_pipeline(settings: &Settings, start_from: Stage) -> Result<Pipeline> {
    let capturer = if Stage::Capture.runs_from(start_from) {
        backends::chrome(settings)?
    } else {
        // Not launched when capture is skipped.
        ChromeCapturer::new(backends::launcher(settings).unwrap_or_else(|_| BrowserLauncher::new("chromium")))
    };

    let model = if Stage::Summary.runs_from(start_from) {
        backends::gemini(settings)?
    } else {
        // Not called when resuming from publish.
        GeminiClient::new(settings.gemini_api_key.clone().unwrap_or_default())
    };

    let pipeline = Pipeline::new(Arc::new(capturer), Arc::new(model));
    Ok(match backends::optional_slack(settings) {
        Some(slack) => pipeline.with_channel(Arc::new(slack)),
        None => pipeline,
    })
}

fn print_report(report: &PipelineReport) {
    let failures = report.failures();
    if failures.is_empty() {
        note_success("All restaurants processed");
    } else {
        note_warn(&format!("{} restaurant failure(s):", failures.len()));
        let columns = vec![
            Column::new("Stage"),
            Column::new("Restaurant"),
            Column::new("Error").max_width(100),
        ];
        let rows: Vec<Vec<String>> = failures
            .iter()
            .map(|(stage, error)| vec![stage.to_string(), error.id.clone(), error.error.clone()])
            .collect();
        print!("{}", render_table(&columns, &rows));
    }
}

pub async fn run(settings: &Settings, args: RunArgs) -> Result<ExitCode> {
    let restaurants = load_restaurants(&args.sites).await?;
    let config = pipeline_config(settings, &args);
    if let Some(reason) = publish_skip_reason(settings, &args) {
        let message = format!("Publishing skipped: {reason}");
        if skip_is_warning(&args) {
            warn!(start_from = %args.start_from, "{message}");
            note_warn(&message);
        } else {
            note_info(&message);
        }
    }

    let pipeline = build_pipeline(settings, args.start_from)?;
    let report = pipeline.run(&restaurants, &config).await?;
    info!(run_id = %report.run_id, "Pipeline run finished");
    print_report(&report);

    if let Some(error) = report.publish_error() {
        note_error(error);
        return Ok(ExitCode::FAILURE);
    }
    if report.publish.is_some() {
        note_success("Summary published");
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Settings {
        let env: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|k| env.get(k).cloned())
    }

    fn args(channel_id: Option<&str>, no_publish: bool, start_from: Stage) -> RunArgs {
        RunArgs {
            sites: "sites.yaml".into(),
            screenshots_dir: "shots".into(),
            ocr_output: "ocr.json".into(),
            summary_output: "summary.md".into(),
            date: NaiveDate::from_ymd_opt(2025, 6, 4),
            start_from,
            channel_id: channel_id.map(Into::into),
            no_publish,
        }
    }

    #[test]
    fn channel_comes_from_flag_then_environment() {
        let env = settings(&[("SLACK_CHANNEL_ID", "C-ENV")]);
        assert_eq!(publish_channel(&env, &args(Some("C-ARG"), false, Stage::Capture)).as_deref(), Some("C-ARG"));
        assert_eq!(publish_channel(&env, &args(None, false, Stage::Capture)).as_deref(), Some("C-ENV"));
        assert_eq!(publish_channel(&settings(&[]), &args(None, false, Stage::Capture)), None);
    }

    #[test]
    fn no_publish_wins() {
        let env = settings(&[("SLACK_CHANNEL_ID", "C-ENV")]);
        assert_eq!(publish_channel(&env, &args(Some("C-ARG"), true, Stage::Capture)), None);
    }

    #[test]
    fn resuming_at_publish_without_channel_warns() {
        let run = args(None, false, Stage::Publish);
        assert_eq!(
            publish_skip_reason(&settings(&[]), &run),
            Some("no Slack channel configured (pass --channel-id or set SLACK_CHANNEL_ID)")
        );
        assert!(skip_is_warning(&run));
    }

    #[test]
    fn explicit_no_publish_is_informational() {
        let env = settings(&[("SLACK_CHANNEL_ID", "C-ENV")]);
        let run = args(None, true, Stage::Capture);
        assert_eq!(publish_skip_reason(&env, &run), Some("--no-publish given"));
        assert!(!skip_is_warning(&run));
        assert!(skip_is_warning(&args(None, true, Stage::Publish)));
        assert_eq!(publish_skip_reason(&env, &args(None, false, Stage::Publish)), None);
    }

    #[test]
    fn config_follows_arguments() {
        let env = settings(&[("RESTABOT_MAX_CONCURRENCY", "3")]);
        let config = pipeline_config(&env, &args(Some("C1"), false, Stage::Ocr));
        assert_eq!(config.start_from, Stage::Ocr);
        assert_eq!(config.max_concurrency, 3);
        assert_eq!(config.publish_channel.as_deref(), Some("C1"));
        assert_eq!(config.date, NaiveDate::from_ymd_opt(2025, 6, 4).unwrap());
    }

    #[test]
    fn model_key_is_required_unless_resuming_from_publish() {
        let env = settings(&[("CHROME_PATH", "/usr/bin/chromium")]);
        let err = build_pipeline(&env, Stage::Ocr).err().unwrap();
        assert_eq!(err.to_string(), "GEMINI_API_KEY is not set");
        assert!(build_pipeline(&env, Stage::Publish).is_ok());
    }
}
