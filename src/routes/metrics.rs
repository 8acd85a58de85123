use axum::extract::State;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Register descriptions for the fax metrics with the installed recorder.
pub fn describe_metrics() {
    metrics::describe_counter!("fax_jobs_enqueued_total", "Faxes submitted for approval");
    metrics::describe_counter!("fax_approvals_total", "Faxes approved and accepted by the carrier");
    metrics::describe_counter!(
        "fax_submissions_failed_total",
        "Approved faxes the carrier refused or never answered"
    );
    metrics::describe_counter!("fax_jobs_expired_total", "Pending faxes removed by the sweep");
    metrics::describe_counter!(
        "fax_orphans_removed_total",
        "Documents deleted because no pending fax referenced them"
    );
    metrics::describe_counter!(
        "fax_notifications_suppressed_total",
        "Rejected-fax notices coalesced into an earlier one"
    );
    metrics::describe_gauge!("fax_pending_jobs", "Faxes currently awaiting approval or status");
}

/// Prometheus metrics scrape endpoint.
pub async fn prometheus_metrics(State(handle): State<Arc<PrometheusHandle>>) -> impl IntoResponse {
    handle.render()
}
