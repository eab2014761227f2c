use std::env;
use tracing_subscriber::fmt;

/// Initializes tracing using the provided log level as the default filter.
/// `RUST_LOG` wins over the configured level when set.
pub fn init_tracing(level: &str, json: bool) {
    let default_directive = format!("fulfillment_core={}", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt()
            .with_env_filter(filter_directive)
            .json()
            .try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}
