//! Tracing subscriber setup.

use crate::config::LoggingConfig;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured filter. When a log directory is
/// configured, output is mirrored to daily-rolling files; the returned guard
/// must be held until shutdown so buffered lines are flushed.
pub fn init(config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))?;

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    match &config.directory {
        Some(directory) => {
            std::fs::create_dir_all(directory)?;
            let appender = tracing_appender::rolling::daily(directory, "craftopia.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);

            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(file_layer)
                .try_init()?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .try_init()?;
            Ok(None)
        }
    }
}
