mod backends;
mod doctor_cmd;
mod run_cmd;
mod stage_cmd;
mod terminal_output;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::error;

use restabot_browser::ImageFormat;
use restabot_config::{load_env_file, Settings};
use restabot_logging::init_logger;
use restabot_pipeline::Stage;

#[derive(Parser)]
#[command(name = "restabot")]
#[command(about = "Daily restaurant menus: screenshots → OCR → summary → Slack")]
#[command(version)]
struct Cli {
    /// Log level or filter directive (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Also write NDJSON logs to this directory (daily rotation)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Log to the console as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Read environment variables from this file instead of ./.env
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take full-page screenshots of the restaurants' web pages
    Screenshot {
        /// YAML file with the restaurant list
        #[arg(long)]
        sites: PathBuf,
        /// Directory to store the screenshots in
        #[arg(long)]
        out_dir: PathBuf,
        /// Image format: png or jpeg
        #[arg(long, default_value = "png")]
        format: ImageFormat,
        /// JPEG quality (1-100)
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
        quality: Option<u8>,
    },
    /// Download the latest menu photo from each slack:// restaurant's channel
    SlackDownload {
        #[arg(long)]
        sites: PathBuf,
        #[arg(long)]
        out_dir: PathBuf,
    },
    /// Extract menus from the downloaded images
    Ocr {
        #[arg(long)]
        sites: PathBuf,
        /// Directory with `<id>.<ext>` images
        #[arg(long)]
        in_dir: PathBuf,
        /// Where to write the OCR JSON
        #[arg(long)]
        out_file: PathBuf,
        /// Date to process (YYYY-MM-DD); defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Summarize the OCR output into Markdown
    Summary {
        #[arg(long)]
        sites: PathBuf,
        #[arg(long)]
        ocr_output: PathBuf,
        #[arg(long)]
        out_file: PathBuf,
    },
    /// Post a summary file to a Slack channel
    SlackUpload {
        #[arg(long)]
        sites: PathBuf,
        #[arg(long)]
        summary_file: PathBuf,
        /// Channel to post to; defaults to SLACK_CHANNEL_ID
        #[arg(long)]
        channel_id: Option<String>,
    },
    /// Run the whole pipeline
    Run {
        #[arg(long)]
        sites: PathBuf,
        #[arg(long)]
        screenshots_dir: PathBuf,
        #[arg(long)]
        ocr_output: PathBuf,
        #[arg(long)]
        summary_output: PathBuf,
        /// Date to process (YYYY-MM-DD); defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Skip earlier stages and reuse their artifacts
        #[arg(long, default_value = "capture")]
        start_from: Stage,
        /// Channel to publish to; defaults to SLACK_CHANNEL_ID
        #[arg(long)]
        channel_id: Option<String>,
        /// Do not post the summary
        #[arg(long)]
        no_publish: bool,
    },
    /// Check environment, browser and restaurant list
    Doctor {
        #[arg(long)]
        sites: Option<PathBuf>,
    },
}

fn load_settings(env_file: Option<&Path>) -> Result<Settings> {
    match env_file {
        Some(path) => {
            load_env_file(path)?;
            Ok(Settings::from_env())
        }
        None => Ok(Settings::load()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let settings = match load_settings(cli.env_file.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            terminal_output::note_error(&format!("{e:#}"));
            return ExitCode::FAILURE;
        }
    };

    let level = cli.log_level.clone().unwrap_or_else(|| settings.log_level.clone());
    let log_dir = cli.log_dir.clone().or_else(|| settings.log_dir.clone().map(PathBuf::from));
    let _log_guard = init_logger(&level, log_dir.as_deref(), cli.json_logs);

    match dispatch(cli.command, &settings).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            terminal_output::note_error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(command: Commands, settings: &Settings) -> Result<ExitCode> {
    match command {
        Commands::Screenshot {
            sites,
            out_dir,
            format,
            quality,
        } => stage_cmd::screenshot(settings, &sites, &out_dir, format, quality).await,
        Commands::SlackDownload { sites, out_dir } => {
            stage_cmd::slack_download(settings, &sites, &out_dir).await
        }
        Commands::Ocr {
            sites,
            in_dir,
            out_file,
            date,
        } => stage_cmd::ocr(settings, &sites, &in_dir, &out_file, date).await,
        Commands::Summary {
            sites,
            ocr_output,
            out_file,
        } => stage_cmd::summary(settings, &sites, &ocr_output, &out_file).await,
        Commands::SlackUpload {
            sites,
            summary_file,
            channel_id,
        } => stage_cmd::slack_upload(settings, &sites, &summary_file, channel_id.as_deref()).await,
        Commands::Run {
            sites,
            screenshots_dir,
            ocr_output,
            summary_output,
            date,
            start_from,
            channel_id,
            no_publish,
        } => {
            let args = run_cmd::RunArgs {
                sites,
                screenshots_dir,
                ocr_output,
                summary_output,
                date,
                start_from,
                channel_id,
                no_publish,
            };
            run_cmd::run(settings, args).await
        }
        Commands::Doctor { sites } => doctor_cmd::run(settings, sites.as_deref()).await,
    }
}
