//! Tracing subscriber setup: console layer plus an optional JSON file sink.
use std::path::Path;

use eyre::WrapErr;
use lift_config::Logging;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::cli::FILE_GUARD;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// `RUST_LOG` wins over `--log-level` for the console.
pub fn init(level: &str, json: bool, logging: &Logging) -> eyre::Result<()> {
    let console_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries command output; logs go to stderr
    let console: BoxedLayer = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    };

    let mut layers = vec![console];
    if let Some(file) = logging.file.as_deref() {
        layers.push(file_layer(file, logging)?);
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .wrap_err("install tracing subscriber")?;
    Ok(())
}

fn file_layer(file: &str, logging: &Logging) -> eyre::Result<BoxedLayer> {
    let path = Path::new(file);
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let Some(name) = path.file_name() else {
        eyre::bail!("logging.file has no file name: {file}");
    };

    let appender = match logging.rotation.as_deref().unwrap_or("never") {
        "never" => tracing_appender::rolling::never(dir, name),
        "daily" => tracing_appender::rolling::daily(dir, name),
        "hourly" => tracing_appender::rolling::hourly(dir, name),
        other => eyre::bail!("logging.rotation must be never|daily|hourly, got {other:?}"),
    };
    let (writer, guard) = tracing_appender::non_blocking(appender);
    // keep the worker alive until exit so buffered lines are flushed
    let _ = FILE_GUARD.set(guard);

    let filter = EnvFilter::new(logging.level.as_deref().unwrap_or("info"));
    Ok(fmt::layer()
        .json()
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(filter)
        .boxed())
}
