use tracing_subscriber::EnvFilter;

use crate::error::{JoinError, Result};

/// Installs the global fmt subscriber.
///
/// `RUST_LOG` takes precedence over `default_filter`. Calling this again once
/// a subscriber is installed leaves the existing one in place.
pub fn init(default_filter: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter)
            .map_err(|err| JoinError::ConfigError(format!("invalid log filter '{}': {}", default_filter, err)))?,
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        assert!(init("join_board=debug").is_ok());
        assert!(init("join_board=debug").is_ok());
    }
}
