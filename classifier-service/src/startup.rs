use crate::config::{ClassifierConfig, ModelBackend, ModelConfig};
use crate::handlers;
use crate::inference::{MockScorer, OnnxScorer, Predictor, Scorer};
use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics_middleware, request_id_middleware, security_headers_middleware, REQUEST_ID_HEADER,
};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: ClassifierConfig,
    pub predictor: Predictor,
}

impl AppState {
    pub fn new(config: ClassifierConfig, predictor: Predictor) -> Self {
        Self { config, predictor }
    }
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.upload.max_bytes;

    // Browser frontends call this from any origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ping", get(handlers::ping))
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route("/predict", post(handlers::predict))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(cors)
        .with_state(state)
}

/// Load the configured model backend. Called once per process.
pub fn load_predictor(config: &ModelConfig) -> Result<Predictor, AppError> {
    let scorer: Arc<dyn Scorer> = match config.backend {
        ModelBackend::Onnx => {
            let scorer = OnnxScorer::load(Path::new(&config.path), config.intra_threads)
                .map_err(|e| {
                    tracing::error!("Failed to load model from {}: {}", config.path, e);
                    AppError::ModelError(anyhow::Error::new(e))
                })?;
            tracing::info!(model = %scorer.path().display(), "Using ONNX model backend");
            Arc::new(scorer)
        }
        ModelBackend::Mock => {
            tracing::warn!("Using mock model backend; predictions are not medically meaningful");
            Arc::new(MockScorer::new())
        }
    };

    Ok(Predictor::new(scorer))
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
}

impl Application {
    pub async fn build(config: ClassifierConfig) -> Result<Self, AppError> {
        // Session creation parses and optimizes the whole graph; keep it off the reactor.
        let model_config = config.model.clone();
        let predictor = tokio::task::spawn_blocking(move || load_predictor(&model_config))
            .await
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("model loader failed: {}", e)))??;

        let backend = predictor.backend();
        let app = build_router(AppState::new(config.clone(), predictor));

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(
            backend,
            max_upload_bytes = config.upload.max_bytes,
            "Listening on {}",
            port
        );

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}
