use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, register_int_gauge,
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Backend (Strapi) Metrics
    pub static ref BACKEND_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "backend_requests_total",
        "Total number of backend REST calls",
        &["operation", "collection", "status"]
    )
    .unwrap();

    pub static ref BACKEND_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "backend_request_duration_seconds",
        "Backend REST call duration in seconds",
        &["operation", "collection"],
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .unwrap();

    // Judge Metrics
    pub static ref JUDGE_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "judge_request_duration_seconds",
        "Code runner round-trip in seconds",
        &["status"],
        vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .unwrap();

    // Business Metrics
    pub static ref SUBMISSIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "submissions_total",
        "Total number of graded code submissions",
        &["outcome"]
    )
    .unwrap();

    pub static ref PROGRESS_INCREMENTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "progress_increments_total",
        "Total number of topic progress increments",
        &["status"]
    )
    .unwrap();

    pub static ref PROGRESS_OUTBOX_PENDING: IntGauge = register_int_gauge!(
        "progress_outbox_pending",
        "Progress increments waiting to be re-applied"
    )
    .unwrap();

    pub static ref ADMIN_SESSION_TIMERS_ACTIVE: IntGauge = register_int_gauge!(
        "admin_session_timers_active",
        "Number of running administrator dashboard timers"
    )
    .unwrap();

    pub static ref ADMIN_SESSION_PERSIST_FAILURES: IntCounter = register_int_counter!(
        "admin_session_persist_failures_total",
        "Failed session time writes"
    )
    .unwrap();

    pub static ref LOGINS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "logins_total",
        "Login attempts by result",
        &["result"]
    )
    .unwrap();
}

/// Renders all metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e)))
}

/// Helper: track a backend call with metrics
pub async fn track_backend_call<F, T, E>(
    operation: &str,
    collection: &str,
    future: F,
) -> Result<T, E>
where
    F: std::future::Future<Output = Result<T, E>>,
{
    let start = std::time::Instant::now();
    let result = future.await;
    let duration = start.elapsed().as_secs_f64();

    let status = if result.is_ok() { "success" } else { "error" };

    BACKEND_REQUESTS_TOTAL
        .with_label_values(&[operation, collection, status])
        .inc();

    BACKEND_REQUEST_DURATION_SECONDS
        .with_label_values(&[operation, collection])
        .observe(duration);

    result
}

pub fn record_submission(outcome: &str) {
    SUBMISSIONS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_login(result: &str) {
    LOGINS_TOTAL.with_label_values(&[result]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        let _ = HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/health", "200"])
            .get();
        let _ = ADMIN_SESSION_TIMERS_ACTIVE.get();
    }

    #[test]
    fn test_render_metrics() {
        record_submission("correct");

        let output = render_metrics().unwrap();
        assert!(output.contains("submissions_total"));
    }

    #[tokio::test]
    async fn test_track_backend_call_counts_errors() {
        let before = BACKEND_REQUESTS_TOTAL
            .with_label_values(&["find", "metrics-test", "error"])
            .get();

        let result: Result<(), &str> =
            track_backend_call("find", "metrics-test", async { Err("boom") }).await;

        assert!(result.is_err());
        assert_eq!(
            BACKEND_REQUESTS_TOTAL
                .with_label_values(&["find", "metrics-test", "error"])
                .get(),
            before + 1
        );
    }
}
