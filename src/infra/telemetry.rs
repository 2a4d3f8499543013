use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "trellis_cache_hit_total",
            Unit::Count,
            "Post reads served from the cache."
        );
        describe_counter!(
            "trellis_cache_miss_total",
            Unit::Count,
            "Post reads that found no cache entry."
        );
        describe_counter!(
            "trellis_cache_error_total",
            Unit::Count,
            "Cache lookups that failed or returned an undecodable entry."
        );
        describe_counter!(
            "trellis_propagation_dispatched_total",
            Unit::Count,
            "Cache and index propagations started."
        );
        describe_counter!(
            "trellis_propagation_failed_total",
            Unit::Count,
            "Cache and index propagations that returned an error."
        );
        describe_counter!(
            "trellis_propagation_dropped_total",
            Unit::Count,
            "Propagations dropped because the in-flight bound was reached."
        );
        describe_counter!(
            "trellis_related_lookup_failed_total",
            Unit::Count,
            "Related-post lookups that failed and were replaced by an empty list."
        );
        describe_histogram!(
            "trellis_store_read_ms",
            Unit::Milliseconds,
            "Store-of-record read latency on the cache-miss path in milliseconds."
        );
        describe_histogram!(
            "trellis_http_request_ms",
            Unit::Milliseconds,
            "HTTP request latency by route and status in milliseconds."
        );
    });
}
