use std::path::Path;

use clap::ValueEnum;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer, Registry};

use crate::exit::{io_error, CliError, CliResult, FAILURE};

/// Daily log files kept in the log directory.
pub const LOG_FILE_RETENTION: usize = 7;

const LOG_FILE_PREFIX: &str = "ctrlnet";
const LOG_FILE_SUFFIX: &str = "log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> tracing::level_filters::LevelFilter {
        match self {
            LogLevel::Error => tracing::level_filters::LevelFilter::ERROR,
            LogLevel::Warn => tracing::level_filters::LevelFilter::WARN,
            LogLevel::Info => tracing::level_filters::LevelFilter::INFO,
            LogLevel::Debug => tracing::level_filters::LevelFilter::DEBUG,
            LogLevel::Trace => tracing::level_filters::LevelFilter::TRACE,
        }
    }
}

/// Install the stderr subscriber, plus a daily rolling JSON file in
/// `log_dir` when one is given. Link spans show up as `link{remote=..}`.
///
/// The returned guard flushes the file writer on drop; hold it until exit.
pub fn init_logging(
    format: LogFormat,
    level: LogLevel,
    log_dir: Option<&Path>,
) -> CliResult<Option<WorkerGuard>> {
    let stderr = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_thread_names(true);
    let stderr: BoxedLayer = match format {
        LogFormat::Text => stderr.boxed(),
        LogFormat::Json => stderr.json().boxed(),
    };

    let mut layers = vec![stderr];
    let mut guard = None;
    if let Some(dir) = log_dir {
        let (writer, worker) = tracing_appender::non_blocking(file_appender(dir)?);
        layers.push(
            fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .with_thread_names(true)
                .boxed(),
        );
        guard = Some(worker);
    }

    let _ = tracing_subscriber::registry()
        .with(layers)
        .with(level.as_filter())
        .try_init();
    Ok(guard)
}

/// `ctrlnet.<date>.log` in `dir`, rotated daily.
fn file_appender(dir: &Path) -> CliResult<RollingFileAppender> {
    std::fs::create_dir_all(dir).map_err(|err| io_error("log directory unavailable", err))?;
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .max_log_files(LOG_FILE_RETENTION)
        .build(dir)
        .map_err(|err| CliError::new(FAILURE, format!("log file setup failed: {err}")))
}
