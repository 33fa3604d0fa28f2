//! Prometheus metrics
//!
//! Exposes run counters in Prometheus text format at `/metrics`.
//!
//! ## Metrics Exposed
//!
//! - `vigil_info` - Build information
//! - `vigil_uptime_seconds` - Time since the service started
//! - `vigil_runs_total` - Runs dispatched
//! - `vigil_runs_passed` / `vigil_runs_failed` - Runs by verdict
//! - `vigil_runs_errored` - Runs aborted by transport failure or cancellation
//! - `vigil_probes_total` - Endpoint probes attempted
//! - `vigil_last_run_timestamp_seconds` - Unix time of the latest run
//!
//! ```yaml
//! scrape_configs:
//!   - job_name: 'vigil'
//!     static_configs:
//!       - targets: ['vigil:8080']
//!     metrics_path: '/metrics'
//! ```

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use std::fmt::{self, Display, Write};
use tracing::error;

use super::error::SERVICE_VERSION;
use super::state::ApiState;

const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Serve Prometheus-format metrics
pub async fn metrics_handler(State(state): State<ApiState>) -> impl IntoResponse {
    match render(&state) {
        Ok(output) => (StatusCode::OK, [("content-type", CONTENT_TYPE)], output),
        Err(e) => {
            error!(error = %e, "Failed to render metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", CONTENT_TYPE)],
                String::new(),
            )
        }
    }
}

fn render(state: &ApiState) -> Result<String, fmt::Error> {
    let stats = state.stats();
    let mut output = String::new();

    writeln!(output, "# HELP vigil_info Vigil build information")?;
    writeln!(output, "# TYPE vigil_info gauge")?;
    writeln!(
        output,
        "vigil_info{{version=\"{SERVICE_VERSION}\",environment=\"{}\"}} 1",
        state.environment()
    )?;
    writeln!(output)?;

    gauge(
        &mut output,
        "vigil_uptime_seconds",
        "Time since the service started",
        state.uptime().as_secs_f64(),
    )?;
    counter(&mut output, "vigil_runs_total", "Runs dispatched", stats.runs_total)?;
    counter(
        &mut output,
        "vigil_runs_passed",
        "Runs where every endpoint matched",
        stats.runs_passed,
    )?;
    counter(
        &mut output,
        "vigil_runs_failed",
        "Runs with at least one status mismatch",
        stats.runs_failed,
    )?;
    counter(
        &mut output,
        "vigil_runs_errored",
        "Runs aborted without a report",
        stats.runs_errored,
    )?;
    counter(
        &mut output,
        "vigil_probes_total",
        "Endpoint probes attempted",
        stats.probes_total,
    )?;

    if let Some(last) = stats.last_run_at {
        gauge(
            &mut output,
            "vigil_last_run_timestamp_seconds",
            "Unix time of the latest run",
            last.timestamp(),
        )?;
    }

    Ok(output)
}

fn gauge(out: &mut String, name: &str, help: &str, value: impl Display) -> fmt::Result {
    sample(out, name, help, "gauge", value)
}

fn counter(out: &mut String, name: &str, help: &str, value: impl Display) -> fmt::Result {
    sample(out, name, help, "counter", value)
}

fn sample(out: &mut String, name: &str, help: &str, kind: &str, value: impl Display) -> fmt::Result {
    writeln!(out, "# HELP {name} {help}")?;
    writeln!(out, "# TYPE {name} {kind}")?;
    writeln!(out, "{name} {value}")?;
    writeln!(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::{EndpointSpec, ProbeOutcome, RunResult};

    #[test]
    fn test_metrics_before_any_run() {
        let output = render(&ApiState::in_memory()).unwrap();

        assert!(output.contains("vigil_info{version=\""));
        assert!(output.contains("vigil_runs_total 0\n"));
        assert!(output.contains("# TYPE vigil_runs_total counter"));
        assert!(!output.contains("vigil_last_run_timestamp_seconds"));
    }

    #[tokio::test]
    async fn test_metrics_after_runs() {
        let state = ApiState::in_memory();
        let spec = EndpointSpec::get("/", 200);
        state.record_run(&RunResult::new(
            "vigil-v0-a",
            "http://x",
            vec![ProbeOutcome::measured(&spec, 500)],
        ));
        state.record_error(3);

        let output = render(&state).unwrap();
        assert!(output.contains("vigil_runs_total 2\n"));
        assert!(output.contains("vigil_runs_failed 1\n"));
        assert!(output.contains("vigil_runs_errored 1\n"));
        assert!(output.contains("vigil_probes_total 4\n"));
        assert!(output.contains("vigil_last_run_timestamp_seconds "));

        let response = metrics_handler(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
