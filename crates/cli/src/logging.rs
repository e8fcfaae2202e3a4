//! Tracing subscriber setup

use anyhow::Result;
use tablesink_config::{LogConfig, LogFormat, LogOutput};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global subscriber
///
/// `level` is an `EnvFilter` directive; an unparsable one falls back to
/// `info`.
pub(crate) fn init_logging(config: &LogConfig, level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let registry = tracing_subscriber::registry().with(filter);
    match (config.format, config.output) {
        (LogFormat::Console, LogOutput::Stderr) => registry
            .with(fmt::layer().with_target(config.targets).with_writer(std::io::stderr))
            .init(),
        (LogFormat::Console, LogOutput::Stdout) => registry
            .with(fmt::layer().with_target(config.targets).with_writer(std::io::stdout))
            .init(),
        (LogFormat::Json, LogOutput::Stderr) => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(config.targets)
                    .with_writer(std::io::stderr),
            )
            .init(),
        (LogFormat::Json, LogOutput::Stdout) => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(config.targets)
                    .with_writer(std::io::stdout),
            )
            .init(),
    }

    Ok(())
}
