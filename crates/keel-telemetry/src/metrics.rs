//! Dispatch metrics.
//!
//! Recording goes through the [`metrics`] facade. Without an installed
//! recorder every call is a no-op, so the kernel records unconditionally.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `keel_dispatch_total` | Counter | `route`, `status` | Dispatched requests |
//! | `keel_dispatch_duration_seconds` | Histogram | `route` | Dispatch latency |
//! | `keel_dispatch_failures_total` | Counter | `category` | Failed dispatches |

use std::sync::Once;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

/// Counter of dispatched requests.
pub const DISPATCH_TOTAL: &str = "keel_dispatch_total";

/// Histogram of dispatch latency.
pub const DISPATCH_DURATION: &str = "keel_dispatch_duration_seconds";

/// Counter of failed dispatches.
pub const DISPATCH_FAILURES: &str = "keel_dispatch_failures_total";

/// Label used when the request matched no route.
pub const UNMATCHED_ROUTE: &str = "<unmatched>";

static DESCRIBED: Once = Once::new();

/// Registers descriptions for the standard metrics with the current recorder.
///
/// Safe to call repeatedly; descriptions are only emitted once per process.
pub fn describe_metrics() {
    DESCRIBED.call_once(|| {
        describe_counter!(DISPATCH_TOTAL, "Total number of requests dispatched by the kernel");
        describe_histogram!(
            DISPATCH_DURATION,
            Unit::Seconds,
            "Time from route matching to a normalized response"
        );
        describe_counter!(DISPATCH_FAILURES, "Dispatches that ended in the error renderer");
    });
}

/// Records a completed dispatch.
///
/// `route` is the route name, falling back to its pattern, or
/// [`UNMATCHED_ROUTE`].
pub fn record_dispatch(route: &str, status_code: u16, duration: Duration) {
    counter!(
        DISPATCH_TOTAL,
        "route" => route.to_string(),
        "status" => status_code.to_string()
    )
    .increment(1);

    histogram!(DISPATCH_DURATION, "route" => route.to_string()).record(duration.as_secs_f64());
}

/// Records a dispatch that failed with an error of `category`.
pub fn record_failure(category: &str) {
    counter!(DISPATCH_FAILURES, "category" => category.to_string()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        assert!(DISPATCH_TOTAL.starts_with("keel_"));
        assert!(DISPATCH_DURATION.ends_with("_seconds"));
        assert!(DISPATCH_FAILURES.ends_with("_total"));
    }

    #[test]
    fn test_recording_without_recorder() {
        describe_metrics();
        describe_metrics();
        record_dispatch("users.show", 200, Duration::from_millis(3));
        record_dispatch(UNMATCHED_ROUTE, 404, Duration::ZERO);
        record_failure("not_found");
    }
}
