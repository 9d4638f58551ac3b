//! Structured Logger
//!
//! Wraps `tracing` with a console layer, optional JSON formatting, an optional
//! daily-rolling NDJSON file, and environment-based level control.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Keeps the background file writer alive; drop it last so buffered lines are flushed.
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize the global logger.
///
/// `RUST_LOG` overrides `level`. When `log_dir` is given, NDJSON lines are also
/// written to `<log_dir>/restabot.log.YYYY-MM-DD`.
pub fn init_logger(level: &str, log_dir: Option<&Path>, json_console: bool) -> LogGuard {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Console goes to stderr so stage commands can print JSON on stdout.
    let console_layer = if json_console {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed()
    };

    let (file_layer, file_guard) = match log_dir {
        Some(dir) => {
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, "restabot.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    LogGuard {
        _file_guard: file_guard,
    }
}
