use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{Router, routing::get};
use tokenwarden_auth::{
    IdentityStore, InMemoryIdentityStore, SessionService, SessionState, session_routes,
};
use tokenwarden_auth_file::JsonFileIdentityStore;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::{AppConfig, StorageBackend, StorageConfig};
use crate::handlers;

pub struct TokenWardenServer {
    addr: SocketAddr,
    app: Router,
}

/// Opens the identity store selected by `storage.backend`.
pub async fn open_store(cfg: &StorageConfig) -> anyhow::Result<Arc<dyn IdentityStore>> {
    match cfg.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory identity store; identities are lost on exit");
            Ok(Arc::new(InMemoryIdentityStore::new()))
        }
        StorageBackend::File => {
            let path = cfg
                .path
                .as_ref()
                .context("storage.backend = \"file\" requires storage.path")?;
            let store = JsonFileIdentityStore::open(path)
                .await
                .with_context(|| format!("opening identity store at {}", path.display()))?;
            Ok(Arc::new(store))
        }
    }
}

pub async fn build_app(cfg: &AppConfig) -> anyhow::Result<Router> {
    let store = open_store(&cfg.storage).await?;
    let service = SessionService::from_config(store, &cfg.auth)
        .context("initializing session service")?;
    Ok(build_router(cfg, Arc::new(service)))
}

/// Assembles routes and middleware around an existing session service.
pub fn build_router(cfg: &AppConfig, service: Arc<SessionService>) -> Router {
    let body_limit = cfg.server.body_limit_bytes;
    Router::new()
        // Health and info endpoints
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        // Session lifecycle
        .merge(session_routes(SessionState::new(service)))
        // Middleware stack (order: cors/trace -> body limit)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri().path(),
                        http.status_code = Empty,
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    pub async fn build(self) -> anyhow::Result<TokenWardenServer> {
        let app = build_app(&self.config).await?;

        Ok(TokenWardenServer {
            addr: self.addr,
            app,
        })
    }
}

impl TokenWardenServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .with_context(|| format!("binding {}", self.addr))?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
