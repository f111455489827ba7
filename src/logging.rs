use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Install the global subscriber.
///
/// Console output goes to stderr so stdout only carries the report. When
/// `config.dir` is set and writable, a daily rotated file log is added; keep
/// the returned guard alive until exit so it gets flushed.
pub fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{},tvl_price_lag={}", config.level, config.level))
    });

    let (file_layer, guard) = match config.dir.as_ref() {
        Some(dir) => match std::fs::create_dir_all(dir) {
            Ok(()) => {
                // `rolling::daily` panics if it cannot create the file, so probe first
                let probe = dir.join(".tvl_price_lag_write_test");
                match std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&probe)
                {
                    Ok(_) => {
                        let _ = std::fs::remove_file(&probe);
                        let appender = tracing_appender::rolling::daily(dir, "tvl-price-lag.log");
                        let (writer, guard) = tracing_appender::non_blocking(appender);
                        (
                            Some(
                                tracing_subscriber::fmt::layer()
                                    .with_writer(writer)
                                    .with_ansi(false)
                                    .with_target(true),
                            ),
                            Some(guard),
                        )
                    }
                    Err(e) => {
                        eprintln!(
                            "Warning: Could not write to log directory {} ({}), file logging disabled",
                            dir.display(),
                            e
                        );
                        (None, None)
                    }
                }
            }
            Err(e) => {
                eprintln!(
                    "Warning: Could not create log directory {} ({}), file logging disabled",
                    dir.display(),
                    e
                );
                (None, None)
            }
        },
        None => (None, None),
    };

    let (json_layer, text_layer) = if config.json {
        (
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            ),
            None,
        )
    } else {
        (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            ),
        )
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(text_layer)
        .with(json_layer)
        .with(file_layer)
        .try_init();

    guard
}
