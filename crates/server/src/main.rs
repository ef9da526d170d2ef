//! voxloop-server entry point (spec §6): loads layered config, validates it,
//! builds the call store / vault / hedge engine / provider factory, and
//! serves the SignalingRouter until SIGINT/SIGTERM.
//!
//! Exit codes: 0 normal shutdown, 2 configuration error, 3 vault key
//! missing/too short, 4 port bind failure.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use voxloop_config::{load_settings, ConfigError, Settings};
use voxloop_intelligence::HedgeEngine;
use voxloop_provider::FactoryConfig;
use voxloop_server::{create_router, metrics, AppState};
use voxloop_store::{CallStore, InMemoryCallStore, ScyllaConfig};
use voxloop_vault::CredentialVault;

#[tokio::main]
async fn main() {
    let env = std::env::var("VOXLOOP_ENV").ok();
    let settings = match load_settings(env.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("failed to load configuration: {e}");
            std::process::exit(2);
        }
    };

    if let Err(e) = settings.validate() {
        eprintln!("invalid configuration: {e}");
        match e {
            ConfigError::InvalidValue { field, .. } if field == "vault.encryption_key" => {
                std::process::exit(3);
            }
            _ => std::process::exit(2),
        }
    }

    init_tracing(&settings);
    tracing::info!(
        environment = ?settings.environment,
        version = env!("CARGO_PKG_VERSION"),
        "starting voxloop-server"
    );

    let vault = match CredentialVault::from_str_key(&settings.vault.encryption_key) {
        Ok(vault) => Arc::new(vault),
        Err(e) => {
            tracing::error!(error = %e, "credential vault rejected its key after validation passed");
            std::process::exit(3);
        }
    };

    let call_store: Arc<dyn CallStore> = init_call_store(&settings).await;

    let hedge_engine = Arc::new(HedgeEngine::new(Vec::new(), settings.pipeline.hedge_prewarm_n));
    let factory_config = FactoryConfig { hosted_base_url: settings.provider.hosted_base_url.clone() };

    let metrics_handle = metrics::install_recorder();
    metrics::spawn_metrics_server(&settings, metrics_handle);
    tracing::info!(port = settings.server.metrics_port, "metrics server started");

    let port = settings.server.port;
    let host = settings.server.host.clone();
    let state = AppState::new(settings, call_store, vault, hedge_engine, factory_config);
    let app = create_router(state);

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], port)));

    tracing::info!(%addr, "binding signaling router");
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "failed to bind listener");
            std::process::exit(4);
        }
    };

    if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await {
        tracing::error!(error = %e, "server exited with error");
        std::process::exit(1);
    }

    tracing::info!("server shutdown complete");
}

/// Connects to ScyllaDB per `settings.store`, falling back to the
/// in-process store on connection failure — persistence must never be the
/// reason the service can't start (spec §7: store failures are non-fatal
/// to the call path).
async fn init_call_store(settings: &Settings) -> Arc<dyn CallStore> {
    let scylla_config = ScyllaConfig {
        hosts: settings.store.url.split(',').map(|h| h.trim().to_string()).collect(),
        keyspace: settings.store.keyspace.clone(),
        replication_factor: 1,
    };

    match voxloop_store::init(scylla_config).await {
        Ok(store) => {
            tracing::info!(keyspace = %settings.store.keyspace, "connected to ScyllaDB call store");
            Arc::new(store)
        }
        Err(e) => {
            tracing::warn!(error = %e, "ScyllaDB unavailable, falling back to in-memory call store");
            Arc::new(InMemoryCallStore::new())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}

#[cfg(feature = "telemetry")]
fn init_tracing(settings: &Settings) {
    use opentelemetry_otlp::WithExportConfig;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("voxloop={},tower_http=info", settings.observability.log_level).into());

    let subscriber = tracing_subscriber::registry().with(env_filter);
    let fmt_layer = if settings.observability.json_logs {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    if settings.observability.tracing_enabled {
        if let Some(endpoint) = &settings.observability.otlp_endpoint {
            let pipeline = opentelemetry_otlp::new_pipeline()
                .tracing()
                .with_exporter(opentelemetry_otlp::new_exporter().tonic().with_endpoint(endpoint))
                .with_trace_config(opentelemetry_sdk::trace::Config::default().with_resource(
                    opentelemetry_sdk::Resource::new(vec![
                        opentelemetry::KeyValue::new("service.name", "voxloop-server"),
                        opentelemetry::KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
                    ]),
                ))
                .install_batch(opentelemetry_sdk::runtime::Tokio);

            match pipeline {
                Ok(tracer) => {
                    let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);
                    subscriber.with(fmt_layer).with(otel_layer).init();
                    tracing::info!(%endpoint, "OpenTelemetry tracing enabled");
                    return;
                }
                Err(e) => eprintln!("failed to initialize OpenTelemetry, falling back: {e}"),
            }
        }
    }
    subscriber.with(fmt_layer).init();
}

#[cfg(not(feature = "telemetry"))]
fn init_tracing(settings: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("voxloop={},tower_http=info", settings.observability.log_level).into());

    let subscriber = tracing_subscriber::registry().with(env_filter);
    let fmt_layer = if settings.observability.json_logs {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    subscriber.with(fmt_layer).init();
}
