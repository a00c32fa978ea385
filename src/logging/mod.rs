//! Tracing setup for binaries and services embedding this crate.

use tracing_subscriber::EnvFilter;

/// Initialize the global subscriber. JSON output matches what the log
/// shipper expects in deployment; plain output is for local runs. Safe to
/// call more than once.
pub fn init(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,chat_coordinator=debug"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if json {
        let _ = builder.json().try_init();
    } else {
        let _ = builder.try_init();
    }
}
