use crate::error::{AppError, AppResult};
use crate::proxy::common::domain_filter::DomainAllowList;
use crate::proxy::config::ProxyConfig;
use crate::proxy::upstream::UpstreamClient;
use axum::{
    extract::DefaultBodyLimit,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

/// Largest accepted relay instruction
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Axum application state, read-only after startup
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ProxyConfig>,
    pub domains: Arc<DomainAllowList>,
    pub upstream: Arc<UpstreamClient>,
}

impl AppState {
    pub fn new(config: ProxyConfig) -> AppResult<Self> {
        let upstream = UpstreamClient::new(config.request_timeout)?;
        let domains = DomainAllowList::new(&config.allowed_domains);

        Ok(Self {
            config: Arc::new(config),
            domains: Arc::new(domains),
            upstream: Arc::new(upstream),
        })
    }

    /// Budget for one relay request, DNS validation and outbound call together
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.request_timeout)
    }
}

/// Build routes: `/health` is open, `/proxy` sits behind the token check
pub fn build_router(state: AppState) -> Router {
    use crate::proxy::handlers;

    let relay_routes = Router::new()
        .route("/proxy", post(handlers::relay::handle_proxy))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::proxy::middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check_handler))
        .merge(relay_routes)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Axum server instance
pub struct AxumServer {
    shutdown_tx: Option<oneshot::Sender<()>>,
    local_addr: std::net::SocketAddr,
}

impl AxumServer {
    /// Start Axum server
    pub async fn start(config: ProxyConfig) -> AppResult<(Self, tokio::task::JoinHandle<()>)> {
        let addr = config.get_bind_address();
        let state = AppState::new(config)?;
        let app = build_router(state);

        // Bind address
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| AppError::Server(format!("Failed to bind address {}: {}", addr, e)))?;
        let local_addr = listener.local_addr()?;

        tracing::info!("Relay server started at http://{}", local_addr);

        // Create shutdown channel
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let server_instance = Self {
            shutdown_tx: Some(shutdown_tx),
            local_addr,
        };

        // Start server in new task
        let handle = tokio::spawn(async move {
            use hyper::server::conn::http1;
            use hyper_util::rt::TokioIo;
            use hyper_util::service::TowerToHyperService;

            loop {
                tokio::select! {
                    res = listener.accept() => {
                        match res {
                            Ok((stream, _)) => {
                                let io = TokioIo::new(stream);
                                let service = TowerToHyperService::new(app.clone());

                                tokio::task::spawn(async move {
                                    if let Err(err) = http1::Builder::new()
                                        .serve_connection(io, service)
                                        .await
                                    {
                                        debug!("Connection handling finished or errored: {:?}", err);
                                    }
                                });
                            }
                            Err(e) => {
                                error!("Failed to accept connection: {:?}", e);
                            }
                        }
                    }
                    _ = &mut shutdown_rx => {
                        tracing::info!("Relay server stopped listening");
                        break;
                    }
                }
            }
        });

        Ok((server_instance, handle))
    }

    pub fn local_addr(&self) -> std::net::SocketAddr {
        self.local_addr
    }

    /// Stop server
    pub fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Health check handler
async fn health_check_handler() -> Response {
    Json(serde_json::json!({
        "status": "ok"
    }))
    .into_response()
}
