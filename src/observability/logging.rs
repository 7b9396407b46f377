//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once at startup
//! - Derive the default filter from the configured log level
//!
//! # Design Decisions
//! - `RUST_LOG` overrides the configured level when set
//! - Human-readable fmt output; fields carry the request ID

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub fn default_filter(level: &str) -> String {
    format!("image_router={level},tower_http={level}")
}

/// Install the global subscriber.
///
/// Calling this twice is harmless; the second install is ignored.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(level).into());

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        assert_eq!(default_filter("warn"), "image_router=warn,tower_http=warn");
    }

    #[test]
    fn test_init_twice() {
        init_logging("debug");
        init_logging("info");
    }
}
