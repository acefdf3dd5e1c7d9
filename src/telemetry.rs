//! Tracing setup

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, LoggingSection};

/// Install a global subscriber. `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(logging: &LoggingSection) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(logging.level.clone()))
        .unwrap_or_else(|_| EnvFilter::new("cloudfile=info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match logging.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    }
    .context("failed to install tracing subscriber")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_installs_once() {
        let logging = LoggingSection {
            level: "cloudfile=debug".to_string(),
            format: LogFormat::Text,
        };

        init_tracing(&logging).unwrap();
        tracing::debug!("subscriber installed");

        // the global subscriber can only be set once per process
        assert!(init_tracing(&logging).is_err());
    }
}
