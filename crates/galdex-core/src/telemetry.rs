//! Process-level logging setup.
//!
//! Embedding applications call [`init`] once at startup; libraries in this
//! workspace only emit `tracing` events and never install a subscriber.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `LOG_FORMAT`: "json" or "text" (default: "text")
//! - `LOG_ANSI`: "true"/"false" override for ANSI colors
//! - `RUST_LOG`: standard env filter (default: "galdex=info")

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Load `.env` and install the global tracing subscriber.
///
/// Safe to call only once per process. Returns an error string when a
/// subscriber is already installed.
pub fn init() -> Result<(), String> {
    dotenvy::dotenv().ok();

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "galdex=info".into());
    let registry = tracing_subscriber::registry().with(env_filter);

    let result = if log_format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        let mut layer = tracing_subscriber::fmt::layer();
        if let Some(ansi) = log_ansi {
            layer = layer.with_ansi(ansi);
        }
        registry.with(layer).try_init()
    };
    result.map_err(|e| e.to_string())
}
