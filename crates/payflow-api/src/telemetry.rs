//! Tracing subscriber, optional OTLP export, and the metrics-backed
//! `Telemetry` handle.

use std::time::Duration;

use axum::http::{Method, StatusCode};
use opentelemetry::metrics::{Counter, Histogram};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{KeyValue, global};
use opentelemetry_otlp::{MetricExporter, SpanExporter, WithExportConfig};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use payflow_core::telemetry::{Signal, Telemetry};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::AppConfig;
use crate::error::AppError;
use crate::middleware::RequestMetrics;

const SERVICE_NAME: &str = "payflow-api";

/// Request duration buckets, in seconds.
const DURATION_BUCKETS: [f64; 11] = [0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];

/// Owns the export pipelines. Call [`TelemetryGuard::shutdown`] before the
/// process exits so buffered spans and metrics are flushed.
#[derive(Debug, Default)]
pub struct TelemetryGuard {
    tracer_provider: Option<SdkTracerProvider>,
    meter_provider: Option<SdkMeterProvider>,
}

impl TelemetryGuard {
    /// Flushes and stops the export pipelines.
    pub fn shutdown(self) {
        if let Some(provider) = self.tracer_provider
            && let Err(e) = provider.shutdown()
        {
            tracing::warn!(error = %e, "failed to shut down tracer provider");
        }
        if let Some(provider) = self.meter_provider
            && let Err(e) = provider.shutdown()
        {
            tracing::warn!(error = %e, "failed to shut down meter provider");
        }
    }
}

/// Installs the global tracing subscriber.
///
/// Logs are JSON in production and human-readable otherwise, filtered by
/// `RUST_LOG` (default `info`). When an OTLP endpoint is configured, spans
/// and metrics are exported to it as well.
///
/// # Errors
///
/// Returns `AppError::Telemetry` if an exporter cannot be built or a
/// subscriber is already installed.
pub fn init(config: &AppConfig) -> Result<TelemetryGuard, AppError> {
    let fmt_layer = if config.is_production() {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    let mut guard = TelemetryGuard::default();
    let otel_layer = match &config.otlp_endpoint {
        Some(endpoint) => {
            let resource = Resource::builder().with_service_name(SERVICE_NAME).build();

            let span_exporter = SpanExporter::builder()
                .with_tonic()
                .with_endpoint(endpoint)
                .build()
                .map_err(|e| AppError::Telemetry(format!("span exporter: {e}")))?;
            let tracer_provider = SdkTracerProvider::builder()
                .with_batch_exporter(span_exporter)
                .with_resource(resource.clone())
                .build();

            let metric_exporter = MetricExporter::builder()
                .with_tonic()
                .with_endpoint(endpoint)
                .build()
                .map_err(|e| AppError::Telemetry(format!("metric exporter: {e}")))?;
            let meter_provider = SdkMeterProvider::builder()
                .with_periodic_exporter(metric_exporter)
                .with_resource(resource)
                .build();
            global::set_meter_provider(meter_provider.clone());

            let tracer = tracer_provider.tracer(SERVICE_NAME);
            guard.tracer_provider = Some(tracer_provider);
            guard.meter_provider = Some(meter_provider);
            Some(tracing_opentelemetry::layer().with_tracer(tracer))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(otel_layer)
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init()
        .map_err(|e| AppError::Telemetry(e.to_string()))?;

    Ok(guard)
}

/// `Telemetry` backed by an OpenTelemetry counter. Without a configured
/// meter provider the global meter is a no-op.
#[derive(Clone)]
pub struct OtelTelemetry {
    initiations: Counter<u64>,
}

impl OtelTelemetry {
    /// Creates the counters on the global meter.
    #[must_use]
    pub fn new() -> Self {
        let meter = global::meter(SERVICE_NAME);
        Self {
            initiations: meter
                .u64_counter("payflow.payment_initiations")
                .with_description("Payment initiation outcomes, by outcome")
                .build(),
        }
    }
}

impl Default for OtelTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl Telemetry for OtelTelemetry {
    fn record(&self, signal: Signal) {
        self.initiations
            .add(1, &[KeyValue::new("outcome", signal.as_str())]);
    }
}

/// `RequestMetrics` backed by an OpenTelemetry counter (by method, route
/// and status) and a duration histogram (by method and route).
#[derive(Clone)]
pub struct OtelRequestMetrics {
    requests: Counter<u64>,
    duration: Histogram<f64>,
}

impl OtelRequestMetrics {
    /// Creates the instruments on the global meter.
    #[must_use]
    pub fn new() -> Self {
        let meter = global::meter(SERVICE_NAME);
        Self {
            requests: meter
                .u64_counter("payflow.http.requests")
                .with_description("HTTP requests, by method, route and status code")
                .build(),
            duration: meter
                .f64_histogram("payflow.http.request_duration")
                .with_description("HTTP request duration, by method and route")
                .with_unit("s")
                .with_boundaries(DURATION_BUCKETS.to_vec())
                .build(),
        }
    }
}

impl Default for OtelRequestMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestMetrics for OtelRequestMetrics {
    fn record(&self, method: &Method, route: &str, status: StatusCode, elapsed: Duration) {
        let method = KeyValue::new("method", method.as_str().to_owned());
        let route = KeyValue::new("route", route.to_owned());
        self.requests.add(
            1,
            &[
                method.clone(),
                route.clone(),
                KeyValue::new("status_code", i64::from(status.as_u16())),
            ],
        );
        self.duration.record(elapsed.as_secs_f64(), &[method, route]);
    }
}
