//! Terminal logging for the native build

use std::str::FromStr;
use tracing_subscriber::{fmt, EnvFilter};

const JSON_ENV: &str = "ASSETWATCH_LOG_JSON";
const DEFAULT_FILTER: &str = "assetwatch=info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

impl LogFormat {
    /// `ASSETWATCH_LOG_JSON=1` selects JSON, otherwise pretty.
    pub fn from_env() -> Self {
        match std::env::var(JSON_ENV) {
            Ok(value) if value == "1" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {}", other)),
        }
    }
}

/// Install the stderr subscriber; `RUST_LOG` overrides the default filter.
/// Later calls are no-ops.
pub fn init_logging(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    let _ = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
}
