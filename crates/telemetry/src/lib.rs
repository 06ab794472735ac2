//! Tracing subscriber bootstrap.

use anyhow::anyhow;
use shelf_kernel::settings::{LogFormat, TelemetrySettings};
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins over the configured filter. Fails if a subscriber is
/// already installed.
pub fn init(settings: &TelemetrySettings) -> anyhow::Result<()> {
    let filter = build_filter(settings);
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let installed = match settings.log_format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().flatten_event(true).try_init(),
    };
    installed.map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))?;

    tracing::info!(
        target: "shelf-telemetry",
        format = ?settings.log_format,
        "telemetry initialized"
    );
    Ok(())
}

/// Install a subscriber for binaries that run before settings are available.
/// Silently keeps any subscriber that is already installed.
pub fn init_fallback() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_filter(&TelemetrySettings::default()))
        .try_init();
}

fn build_filter(settings: &TelemetrySettings) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_filter_falls_back_to_info() {
        let settings = TelemetrySettings {
            log_format: LogFormat::Pretty,
            filter: "[[not a filter".to_string(),
        };
        // RUST_LOG may be set by the developer; only check we get a filter back.
        let filter = build_filter(&settings);
        assert!(!filter.to_string().is_empty());
    }
}
