//! Logging and tracing bootstrap.

use bookstack_kernel::settings::{LogFormat, TelemetrySettings};
use tracing_subscriber::EnvFilter;

/// Initialize the tracing pipeline according to settings.
///
/// Safe to call more than once; only the first call installs a subscriber
/// (subsequent calls, e.g. from tests, are no-ops).
pub fn init(settings: &TelemetrySettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match settings.log_format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init(),
    };

    if result.is_ok() {
        tracing::debug!(format = ?settings.log_format, "telemetry initialized");
    }
}
