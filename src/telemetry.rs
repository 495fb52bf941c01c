//! Telemetry logic.
//! Request metrics, process gauges and the instrumentation middleware.
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{FromRef, MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use metrics::{Key, Label, Level, Metadata, Recorder, Unit};
use metrics_exporter_prometheus::{
    BuildError, Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder,
};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, RefreshKind, System};
use tokio::time::sleep;

use crate::AppState;

pub const REQUEST_COUNT: &str = "prometheus_demo_request_count";
pub const REQUEST_LATENCY: &str = "prometheus_demo_request_latency_seconds";
const PROCESS_MEMORY: &str = "process_memory_used_bytes";
const PROCESS_CPU: &str = "process_cpu_usage";

const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.002, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Metrics registry shared by every request.
///
/// The recorder is owned here instead of being installed globally, so each
/// [`Metrics`] value (one per process, or one per test) is independent.
#[derive(Clone)]
pub struct Metrics {
    recorder: Arc<PrometheusRecorder>,
    handle: PrometheusHandle,
}

impl Metrics {
    /// Build the registry and describe both request families.
    pub fn new() -> Result<Self, BuildError> {
        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Full(REQUEST_LATENCY.to_owned()),
                LATENCY_BUCKETS,
            )?
            .build_recorder();

        recorder.describe_counter(
            REQUEST_COUNT.into(),
            None,
            "Number of Requests to endpoint".into(),
        );
        recorder.describe_histogram(
            REQUEST_LATENCY.into(),
            Some(Unit::Seconds),
            "Request Latency".into(),
        );

        let handle = recorder.handle();
        Ok(Self {
            recorder: Arc::new(recorder),
            handle,
        })
    }

    /// Count one request answered with `code` on `route`.
    pub fn record_request(&self, code: &str, route: &str) {
        self.recorder
            .register_counter(&key(REQUEST_COUNT, code, route), &metadata())
            .increment(1);
    }

    /// Observe how long a request answered with `code` on `route` took.
    pub fn record_latency(&self, code: &str, route: &str, seconds: f64) {
        self.recorder
            .register_histogram(&key(REQUEST_LATENCY, code, route), &metadata())
            .record(seconds);
    }

    /// Prometheus text exposition of every metric recorded so far.
    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// Refresh process memory and CPU gauges every 10 seconds.
    /// Also drains histogram samples that no scrape collected yet.
    pub fn spawn_process_collector(&self) {
        self.recorder.describe_gauge(
            PROCESS_CPU.into(),
            Some(Unit::Percent),
            "CPU usage of the process in percentage.".into(),
        );
        self.recorder.describe_gauge(
            PROCESS_MEMORY.into(),
            Some(Unit::Bytes),
            "Total process memory in bytes.".into(),
        );

        let metrics = self.clone();
        let mut system = System::new_with_specifics(RefreshKind::nothing());
        let pid = Pid::from_u32(std::process::id());

        tokio::spawn(async move {
            loop {
                system.refresh_processes_specifics(
                    ProcessesToUpdate::Some(&[pid]),
                    true,
                    ProcessRefreshKind::nothing().with_memory().with_cpu(),
                );

                if let Some(process) = system.process(pid) {
                    metrics
                        .recorder
                        .register_gauge(&Key::from_name(PROCESS_MEMORY), &metadata())
                        .set(process.memory() as f64);
                    metrics
                        .recorder
                        .register_gauge(&Key::from_name(PROCESS_CPU), &metadata())
                        .set(process.cpu_usage() as f64);
                }

                metrics.handle.run_upkeep();
                sleep(Duration::from_secs(10)).await;
            }
        });
    }
}

impl FromRef<AppState> for Metrics {
    fn from_ref(state: &AppState) -> Metrics {
        state.metrics.clone()
    }
}

fn key(name: &'static str, code: &str, route: &str) -> Key {
    Key::from_parts(
        name,
        vec![
            Label::new("code", code.to_owned()),
            Label::new("path", route.to_owned()),
        ],
    )
}

fn metadata() -> Metadata<'static> {
    Metadata::new(module_path!(), Level::INFO, Some(module_path!()))
}

/// Log, time and count every request going through an instrumented route.
pub async fn track(
    State(metrics): State<Metrics>,
    req: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    tracing::info!(method = %req.method(), uri = %req.uri(), "incoming request");

    let path = if let Some(matched_path) = req.extensions().get::<MatchedPath>() {
        matched_path.as_str().to_owned()
    } else {
        req.uri().path().to_owned()
    };

    let response = next.run(req).await;

    let status = response.status().as_u16().to_string();
    metrics.record_request(&status, &path);
    metrics.record_latency(&status, &path, start.elapsed().as_secs_f64());

    response
}

/// Value of the sample `name{labels...}` in a rendered exposition.
#[cfg(test)]
pub(crate) fn sample(rendered: &str, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
    let prefix = format!("{name}{{");
    rendered
        .lines()
        .filter(|line| line.starts_with(&prefix))
        .filter_map(|line| line.rsplit_once(' '))
        .find(|(series, _)| {
            labels
                .iter()
                .all(|(label, value)| series.contains(&format!("{label}=\"{value}\"")))
        })
        .and_then(|(_, value)| value.parse().ok())
}
