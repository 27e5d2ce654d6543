use classifier_service::config::ClassifierConfig;
use classifier_service::services::init_metrics;
use classifier_service::startup::Application;
use service_core::observability::init_tracing;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Initialize metrics recorder (must be before any metrics are recorded)
    init_metrics();

    let config = ClassifierConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    init_tracing(
        "classifier-service",
        &config.common.log_level,
        config.common.otlp_endpoint.as_deref(),
    );

    let app = Application::build(config).await.map_err(|e| {
        tracing::error!("Failed to start classifier service: {}", e);
        std::io::Error::other(format!("Startup error: {}", e))
    })?;

    tracing::info!("classifier-service ready on port {}", app.port());

    app.run_until_stopped().await
}
