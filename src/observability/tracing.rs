use opentelemetry::{global, trace::TraceContextExt, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    trace::{self, RandomIdGenerator, Sampler, Tracer},
    Resource,
};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use tracing_opentelemetry::{OpenTelemetryLayer, OpenTelemetrySpanExt};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::ObservabilityConfig;

pub const DEFAULT_OTLP_ENDPOINT: &str = "http://localhost:4317";

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ObservabilityError {
    #[error("Failed to initialize OpenTelemetry: {0}")]
    OpenTelemetryInit(#[from] opentelemetry::trace::TraceError),
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),
}

/// Install the global subscriber: env filter, OTLP span export and either
/// JSON or human-readable log lines.
///
/// `RUST_LOG` wins over `log_level` when set.
pub fn init_observability(config: &ObservabilityConfig) -> Result<(), ObservabilityError> {
    let endpoint = config
        .otlp_endpoint
        .as_deref()
        .filter(|endpoint| !endpoint.trim().is_empty())
        .unwrap_or(DEFAULT_OTLP_ENDPOINT);

    let tracer = build_tracer(&config.service_name, &config.service_version, endpoint)?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(&config.service_name, &config.log_level)));

    // Span context is carried by the trace_id field, not the span list
    let log_layer = if config.enable_json_logging {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(false)
            .with_span_list(false)
            .with_target(false)
            .log_internal_errors(false)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .compact()
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(OpenTelemetryLayer::new(tracer))
        .with(log_layer)
        .try_init()
        .map_err(|e| ObservabilityError::TracingInit(e.to_string()))?;

    info!(
        service = %config.service_name,
        version = %config.service_version,
        otlp_endpoint = %endpoint,
        json = config.enable_json_logging,
        "Observability initialized"
    );
    Ok(())
}

/// Filter used when `RUST_LOG` is unset: the service at `log_level`, AWS and
/// HTTP plumbing at info
fn default_filter(service_name: &str, log_level: &str) -> String {
    let mut directives = vec![format!("{}={}", service_name.replace('-', "_"), log_level)];
    directives.extend(
        ["tower_http", "aws_sdk_dynamodb", "aws_sdk_ssm", "aws_config"]
            .iter()
            .map(|target| format!("{}=info", target)),
    );
    directives.join(",")
}

/// Trace ID of the active span, if it belongs to a sampled OpenTelemetry trace
pub fn get_current_trace_id() -> Option<String> {
    let context = tracing::Span::current().context();
    let span = context.span();
    let span_context = span.span_context();

    span_context
        .is_valid()
        .then(|| span_context.trace_id().to_string())
}

#[macro_export]
macro_rules! info_with_trace {
    ($($arg:tt)*) => {
        match $crate::observability::tracing::get_current_trace_id() {
            Some(trace_id) => tracing::info!(trace_id = %trace_id, $($arg)*),
            None => tracing::info!($($arg)*),
        }
    };
}

#[macro_export]
macro_rules! warn_with_trace {
    ($($arg:tt)*) => {
        match $crate::observability::tracing::get_current_trace_id() {
            Some(trace_id) => tracing::warn!(trace_id = %trace_id, $($arg)*),
            None => tracing::warn!($($arg)*),
        }
    };
}

#[macro_export]
macro_rules! error_with_trace {
    ($($arg:tt)*) => {
        match $crate::observability::tracing::get_current_trace_id() {
            Some(trace_id) => tracing::error!(trace_id = %trace_id, $($arg)*),
            None => tracing::error!($($arg)*),
        }
    };
}

fn build_tracer(
    service_name: &str,
    service_version: &str,
    endpoint: &str,
) -> Result<Tracer, ObservabilityError> {
    let resource = Resource::new(vec![
        KeyValue::new("service.name", service_name.to_string()),
        KeyValue::new("service.version", service_version.to_string()),
        KeyValue::new("service.namespace", "foodlog"),
        KeyValue::new("cloud.provider", "aws"),
        KeyValue::new("telemetry.sdk.language", "rust"),
    ]);

    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(endpoint);

    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(exporter)
        .with_trace_config(
            trace::config()
                .with_sampler(Sampler::AlwaysOn)
                .with_id_generator(RandomIdGenerator::default())
                .with_resource(resource),
        )
        .with_batch_config(
            trace::BatchConfig::default()
                .with_max_export_batch_size(256)
                .with_scheduled_delay(Duration::from_secs(1)),
        )
        .install_batch(opentelemetry_sdk::runtime::Tokio)?;

    Ok(tracer)
}

/// Flush pending spans, giving up after five seconds
pub async fn shutdown_observability() {
    let flush = tokio::task::spawn_blocking(global::shutdown_tracer_provider);

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, flush).await {
        Ok(Ok(())) => info!("Tracer provider shut down"),
        Ok(Err(e)) => warn!("Tracer provider shutdown failed: {}", e),
        Err(_) => warn!(
            "Tracer provider shutdown timed out after {}s",
            SHUTDOWN_TIMEOUT.as_secs()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_shutdown_is_bounded() {
        let start = std::time::Instant::now();
        shutdown_observability().await;

        assert!(start.elapsed() < SHUTDOWN_TIMEOUT + Duration::from_secs(1));
    }

    #[test]
    fn test_default_filter_uses_crate_target() {
        let filter = default_filter("foodlog-rs", "debug");
        assert!(filter.starts_with("foodlog_rs=debug,"));
        assert!(filter.contains("aws_sdk_dynamodb=info"));
        assert!(EnvFilter::try_new(filter).is_ok());
    }

    #[test]
    fn test_no_trace_id_outside_span() {
        assert_eq!(get_current_trace_id(), None);
    }
}
