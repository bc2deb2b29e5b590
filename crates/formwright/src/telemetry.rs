//! Tracing subscriber setup for hosts embedding the library

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogConfig;
use crate::error::ConfigError;

/// Install a global `fmt` subscriber.
///
/// `RUST_LOG` wins over the configured filter. Fails if a global subscriber
/// is already set.
pub fn init(config: &LogConfig) -> Result<(), ConfigError> {
    let filter = match std::env::var("RUST_LOG") {
        Ok(directives) if !directives.trim().is_empty() => directives,
        _ => config.filter.clone(),
    };
    let filter = EnvFilter::try_new(&filter)
        .map_err(|e| ConfigError::Telemetry(format!("invalid filter {filter:?}: {e}")))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| ConfigError::Telemetry(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        let config = LogConfig {
            filter: "formwright=debug".to_string(),
        };
        // another test may already have installed a subscriber
        let _ = init(&config);
        assert!(matches!(init(&config), Err(ConfigError::Telemetry(_))));
    }
}
