use opentelemetry::{KeyValue, metrics::UpDownCounter};
use std::sync::LazyLock;

static STATDS: LazyLock<UpDownCounter<i64>> = LazyLock::new(|| {
    logfire::i64_up_down_counter("twilio_statds")
        .with_description("Twilio callback and outbound statistics")
        .with_unit("attempt")
        .build()
});

fn incr_statds(metric: String, value: String) {
    STATDS.add(1, &[KeyValue::new(metric, value)]);
}

/// Records the decision taken for an inbound callback
pub fn incr_callback_statds(decision: &str) {
    incr_statds("callback".to_string(), decision.into())
}

/// Records the outcome of an outbound call or message submission
pub fn incr_outbound_statds(outcome: &str) {
    incr_statds("outbound".to_string(), outcome.into())
}
