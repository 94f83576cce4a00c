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

/// Register descriptions for every metric the service emits. Idempotent.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "catalogd_cache_object_hit_total",
            Unit::Count,
            "Entity lookups served from the entity cache."
        );
        describe_counter!(
            "catalogd_cache_object_miss_total",
            Unit::Count,
            "Entity lookups that missed the entity cache."
        );
        describe_counter!(
            "catalogd_cache_query_hit_total",
            Unit::Count,
            "Search, count and list lookups served from the query tier."
        );
        describe_counter!(
            "catalogd_cache_query_miss_total",
            Unit::Count,
            "Search, count and list lookups that missed the query tier."
        );
        describe_counter!(
            "catalogd_cache_flush_total",
            Unit::Count,
            "Query tier generations discarded by writes or reinitialization."
        );
        describe_counter!(
            "catalogd_cache_coalesce_leader_total",
            Unit::Count,
            "Cold list computations started."
        );
        describe_counter!(
            "catalogd_cache_coalesce_joined_total",
            Unit::Count,
            "Requests that joined a list computation already in flight."
        );
        describe_histogram!(
            "catalogd_search_ms",
            Unit::Milliseconds,
            "Search latency in milliseconds, labelled by query tier outcome."
        );
    });
}
