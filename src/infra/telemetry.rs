use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::cache::{
    METRIC_COLLECTION_HIT, METRIC_COLLECTION_MISS, METRIC_FULL_CLEAR, METRIC_INVALIDATION,
    METRIC_PARTIAL_FILL,
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
            METRIC_COLLECTION_HIT,
            Unit::Count,
            "Link listings answered from a cached collection entry."
        );
        describe_counter!(
            METRIC_COLLECTION_MISS,
            Unit::Count,
            "Link listings that had to query the store for their id list."
        );
        describe_counter!(
            METRIC_PARTIAL_FILL,
            Unit::Count,
            "Link listings that fetched missing snapshots from the store."
        );
        describe_counter!(
            METRIC_INVALIDATION,
            Unit::Count,
            "Invalidation plans applied, labelled by plan kind."
        );
        describe_counter!(
            METRIC_FULL_CLEAR,
            Unit::Count,
            "Link invalidations that fell back to dropping every collection."
        );
    });
}
