//! Tracing subscriber: console layer plus an optional JSON-lines file.

use std::path::Path;

use handwheel_config::{Logging, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::cli::FILE_GUARD;

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `level`; `level` falls back to `[logging].level`,
/// then `info`. Console output goes to stderr so stdout stays parseable.
pub fn init(json: bool, level: Option<&str>, logging: Option<&Logging>) -> eyre::Result<()> {
    let level = level
        .or_else(|| logging.and_then(|l| l.level.as_deref()))
        .unwrap_or("info");
    let filter = match std::env::var("RUST_LOG") {
        Ok(directives) if !directives.is_empty() => EnvFilter::new(directives),
        _ => EnvFilter::try_new(level)
            .map_err(|e| eyre::eyre!("invalid log level {level:?}: {e}"))?,
    };

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    layers.push(if json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer()
            .compact()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed()
    });

    if let Some((file, rotation)) =
        logging.and_then(|l| l.file.as_deref().map(|f| (f, l.rotation)))
    {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .ok_or_else(|| eyre::eyre!("logging.file {path:?} has no file name"))?;
        let appender = match rotation {
            Rotation::Never => tracing_appender::rolling::never(dir, name),
            Rotation::Daily => tracing_appender::rolling::daily(dir, name),
            Rotation::Hourly => tracing_appender::rolling::hourly(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        layers.push(fmt::layer().json().with_ansi(false).with_writer(writer).boxed());
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| eyre::eyre!("install tracing subscriber: {e}"))
}
