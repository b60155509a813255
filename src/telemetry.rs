//! Tracing subscriber setup with optional OTLP span export

use crate::config::{LoggingConfig, TelemetryConfig};
use anyhow::{Context, Result};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Flushes exported spans when dropped
pub struct TelemetryGuard {
    provider: Option<SdkTracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            if let Err(e) = provider.shutdown() {
                eprintln!("Failed to flush trace exporter: {e}");
            }
        }
    }
}

fn default_directives(level: &str) -> String {
    format!("warn,zangli={level},tower_http={level}")
}

/// Filter from `RUST_LOG`, falling back to the configured level for this crate
fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(level)))
}

fn tracer_provider() -> Result<SdkTracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .build()
        .context("Failed to build OTLP span exporter")?;
    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .build())
}

/// Install the global subscriber
///
/// Must be called from inside the tokio runtime when OTLP export is enabled.
pub fn init(logging: &LoggingConfig, telemetry: &TelemetryConfig) -> Result<TelemetryGuard> {
    let provider = if telemetry.otlp_enabled {
        Some(tracer_provider()?)
    } else {
        None
    };
    let otel_layer = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer("zangli")));

    let registry = tracing_subscriber::registry()
        .with(env_filter(&logging.level))
        .with(otel_layer);

    if logging.format == "json" {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    }
    .context("Failed to install tracing subscriber")?;

    if provider.is_some() {
        tracing::info!("OTLP span export enabled");
    }
    Ok(TelemetryGuard { provider })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives() {
        let directives = default_directives("debug");
        assert_eq!(directives, "warn,zangli=debug,tower_http=debug");
        assert!(directives.parse::<EnvFilter>().is_ok());
    }
}
