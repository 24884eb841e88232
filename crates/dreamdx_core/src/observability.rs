//! Tracing subscriber and OpenTelemetry metrics initialization.

#[cfg(feature = "metrics")]
use opentelemetry::{KeyValue, global, metrics::Counter};
#[cfg(feature = "metrics")]
use opentelemetry_otlp::{MetricExporter as OtlpExporter, WithExportConfig};
#[cfg(feature = "metrics")]
use opentelemetry_sdk::{
    Resource,
    metrics::{PeriodicReader, SdkMeterProvider},
};
#[cfg(feature = "metrics")]
use opentelemetry_stdout::MetricExporter as StdoutExporter;
#[cfg(feature = "metrics")]
use std::sync::OnceLock;
#[cfg(feature = "metrics")]
use std::time::Duration;
use dreamdx_error::ConfigError;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use tracing_subscriber::EnvFilter;

/// Output format of the log subscriber.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Install the global tracing subscriber.
///
/// The filter comes from `RUST_LOG` and falls back to `default_filter`.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(format: LogFormat, default_filter: &str) -> Result<(), ConfigError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let result = match format {
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init(),
    };

    result.map_err(|e| ConfigError::new(format!("Failed to install tracing subscriber: {}", e)))
}

/// Destination of exported metrics, chosen by `OTEL_EXPORTER`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum MetricsExporter {
    /// Periodic dumps to standard output
    #[default]
    Stdout,
    /// OTLP over HTTP to `OTEL_EXPORTER_OTLP_ENDPOINT`
    Otlp,
}

impl MetricsExporter {
    /// Exporter named by `value`; unknown or missing names select stdout.
    pub fn from_setting(value: Option<&str>) -> Self {
        match value.map(str::parse::<Self>) {
            Some(Ok(exporter)) => exporter,
            Some(Err(_)) => {
                warn!(value = ?value, "Unknown metrics exporter, using stdout");
                Self::Stdout
            }
            None => Self::Stdout,
        }
    }
}

/// Default OTLP collector address.
pub const DEFAULT_OTLP_ENDPOINT: &str = "http://localhost:4318";

#[cfg(feature = "metrics")]
static OPERATIONS: OnceLock<Counter<u64>> = OnceLock::new();

/// Register the global meter provider for the service.
///
/// Call before the first [`record_operation`]: the operation counter binds to
/// whichever provider is global when it is first used. Without the `metrics`
/// feature this only logs.
///
/// # Errors
///
/// Returns an error if the OTLP exporter cannot be built.
#[instrument(skip_all, fields(service_name))]
pub fn init_metrics(
    service_name: &'static str,
    export_interval_secs: u64,
) -> Result<(), ConfigError> {
    let exporter = MetricsExporter::from_setting(std::env::var("OTEL_EXPORTER").ok().as_deref());

    #[cfg(not(feature = "metrics"))]
    {
        let _ = export_interval_secs;
        info!(%exporter, "Metrics feature disabled; operations are not counted");
        Ok(())
    }

    #[cfg(feature = "metrics")]
    {
        let interval = Duration::from_secs(export_interval_secs);
        let reader = match exporter {
            MetricsExporter::Otlp => {
                let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                    .unwrap_or_else(|_| DEFAULT_OTLP_ENDPOINT.to_string());
                let otlp = OtlpExporter::builder()
                    .with_http()
                    .with_endpoint(&endpoint)
                    .with_timeout(Duration::from_secs(10))
                    .build()
                    .map_err(|e| ConfigError::new(format!("Failed to create OTLP exporter: {}", e)))?;
                info!(endpoint = %endpoint, "Exporting metrics over OTLP");
                PeriodicReader::builder(otlp).with_interval(interval).build()
            }
            MetricsExporter::Stdout => PeriodicReader::builder(StdoutExporter::default())
                .with_interval(interval)
                .build(),
        };

        let provider = SdkMeterProvider::builder()
            .with_resource(
                Resource::builder_empty()
                    .with_attributes([KeyValue::new("service.name", service_name)])
                    .build(),
            )
            .with_reader(reader)
            .build();
        global::set_meter_provider(provider);
        info!(%exporter, export_interval_secs, "Metrics provider registered");
        Ok(())
    }
}

/// Count one narrative operation, labelled by command path and outcome.
///
/// No-op unless the `metrics` feature is enabled.
pub fn record_operation(command: &'static str, outcome: &'static str) {
    #[cfg(feature = "metrics")]
    {
        OPERATIONS
            .get_or_init(|| {
                global::meter("dreamdx")
                    .u64_counter("dreamdx_operations")
                    .with_description("Narrative commands handled, by outcome")
                    .build()
            })
            .add(
                1,
                &[
                    KeyValue::new("command", command),
                    KeyValue::new("outcome", outcome),
                ],
            );
    }
    #[cfg(not(feature = "metrics"))]
    {
        let _ = (command, outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exporter_selection() {
        assert_eq!(MetricsExporter::from_setting(None), MetricsExporter::Stdout);
        assert_eq!(MetricsExporter::from_setting(Some("OTLP")), MetricsExporter::Otlp);
        assert_eq!(MetricsExporter::from_setting(Some("stdout")), MetricsExporter::Stdout);
        assert_eq!(MetricsExporter::from_setting(Some("prometheus")), MetricsExporter::Stdout);
    }

    #[test]
    fn test_record_operation_is_repeatable() {
        record_operation("dream/start", "ok");
        record_operation("dream/start", "error");
    }
}
