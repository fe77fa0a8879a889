//! HTTP server: router, shared state and lifecycle.

mod error;
mod routes;
pub mod session;

use std::sync::Arc;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use glimpse_core::config::LimitsConfig;
use glimpse_core::{AccountStore, Captioner, Config, ImageDecoder, UploadStore, UploadValidator};

pub use session::SessionStore;

/// Everything a handler needs. Built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub captioner: Arc<Captioner>,
    pub accounts: AccountStore,
    pub sessions: Arc<SessionStore>,
    pub uploads: UploadStore,
    pub validator: UploadValidator,
    pub decoder: ImageDecoder,
    pub limits: LimitsConfig,
}

impl AppState {
    pub fn new(
        config: &Config,
        captioner: Captioner,
        accounts: AccountStore,
        uploads: UploadStore,
    ) -> Self {
        Self {
            captioner: Arc::new(captioner),
            accounts,
            sessions: Arc::new(SessionStore::new(&config.session)),
            uploads,
            validator: UploadValidator::new(&config.server),
            decoder: ImageDecoder::new(config.limits.clone()),
            limits: config.limits.clone(),
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let body_limit = (state.limits.max_upload_mb as usize).saturating_mul(1024 * 1024);
    let uploads = ServeDir::new(state.uploads.dir());

    Router::new()
        .route("/", get(routes::index))
        .route("/predict", post(routes::predict))
        .route("/signup", post(routes::signup))
        .route("/signin", post(routes::signin))
        .route("/signout", post(routes::signout))
        .nest_service("/static/uploads", uploads)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Load models, open the account database and serve until shut down.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let captioner = Captioner::load(&config).context("Failed to load caption models")?;
    let accounts = AccountStore::connect(&config.database)
        .await
        .context("Failed to open account database")?;
    let uploads = UploadStore::open(config.upload_dir()).with_context(|| {
        format!(
            "Failed to create upload directory {}",
            config.upload_dir().display()
        )
    })?;
    tracing::info!(
        "{} accounts registered, uploads stored in {}",
        accounts.count().await?,
        uploads.dir().display()
    );

    let state = AppState::new(&config, captioner, accounts, uploads);
    let app = router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
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
}
