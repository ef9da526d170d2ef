//! Process-wide Prometheus metrics exporter (spec §2.2 ambient observability
//! stack). Installs the global `metrics` recorder once at startup and serves
//! the rendered text exposition on a dedicated port, separate from the
//! public SignalingRouter, so `/metrics` is never reachable through a
//! carrier-facing load balancer.

use axum::{routing::get, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use voxloop_config::Settings;

/// Installs the global recorder and returns a handle whose `render()` backs
/// the `/metrics` endpoint. Call exactly once per process, before any
/// `metrics::counter!`/`histogram!` call site executes.
pub fn install_recorder() -> PrometheusHandle {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Prefix("voxloop_latency".to_string()),
            &[0.05, 0.1, 0.2, 0.3, 0.5, 0.75, 1.0, 1.5, 2.0, 3.0, 5.0],
        )
        .expect("static bucket boundaries are always valid")
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

fn metrics_router(handle: PrometheusHandle) -> Router {
    Router::new().route(
        "/metrics",
        get(move || {
            let handle = handle.clone();
            async move { handle.render() }
        }),
    )
}

/// Spawns the metrics listener on `settings.server.metrics_port` as a
/// background task. Binding failure here is logged, not fatal — losing
/// `/metrics` shouldn't take down call handling.
pub fn spawn_metrics_server(settings: &Settings, handle: PrometheusHandle) {
    if !settings.observability.metrics_enabled {
        return;
    }
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], settings.server.metrics_port));
    let router = metrics_router(handle);
    tokio::spawn(async move {
        match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => {
                if let Err(err) = axum::serve(listener, router).await {
                    tracing::error!(error = %err, "metrics server exited");
                }
            }
            Err(err) => {
                tracing::error!(error = %err, %addr, "failed to bind metrics listener");
            }
        }
    });
}
