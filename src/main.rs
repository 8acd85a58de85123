use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use faxgate::{
    app_state::AppState,
    config::AppConfig,
    routes,
    services::{
        coordinator::FaxCoordinator, fax::FaxClient, media::MediaStore, sms::SmsClient,
        trust::TrustList,
    },
};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing faxgate server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);
    routes::metrics::describe_metrics();

    let trust = Arc::new(TrustList::parse(&config.whitelist));
    if trust.is_empty() {
        tracing::warn!("No whitelisted numbers configured, nothing can be faxed");
    }

    let media = Arc::new(MediaStore::new(&config.media_dir, config.media_base_url()));
    media
        .ensure_dir()
        .expect("Failed to create media directory");

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .expect("Failed to build HTTP client");

    tracing::info!("Initializing carrier clients");
    let sms = SmsClient::new(
        http.clone(),
        &config.sms_api_url,
        &config.twilio_sid,
        &config.twilio_token,
        &config.from_number,
        trust.clone(),
    )
    .with_status_callback(config.sms_status_callback());
    let fax = FaxClient::new(
        http,
        &config.fax_api_url,
        &config.twilio_sid,
        &config.twilio_token,
        &config.from_number,
    )
    .with_status_callback(config.fax_status_callback());
    let notifier = Arc::new(sms);

    // Start the fax coordinator
    let shutdown = CancellationToken::new();
    let coordinator = FaxCoordinator::new(notifier.clone(), Arc::new(fax), trust.clone(), media.clone());
    let (coordinator, coordinator_task) = coordinator.spawn(shutdown.clone());

    let state = AppState::new(
        coordinator,
        notifier,
        media,
        trust,
        config.incoming_data_url(),
    );

    // Build API routes
    let app = routes::router(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(64 * 1024 * 1024)); // 64 MB limit

    tracing::info!("Starting faxgate on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => tracing::info!("Received interrupt, shutting down"),
                _ = signal.cancelled() => {}
            }
            signal.cancel();
        })
        .await
        .expect("Server error");

    shutdown.cancel();
    if let Err(e) = coordinator_task.await {
        tracing::error!(error = %e, "Fax coordinator task failed");
    }

    tracing::info!("Shutting down");
}
