use super::handlers;
use crate::config::ApiConfig;
use crate::service::LedgerService;
use crate::supervisor::CancellationToken;
use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use chipstake_types::{ChipstakeError, ChipstakeResult};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub struct ApiState {
    pub service: Arc<LedgerService>,
    pub config: ApiConfig,
    pub started: Instant,
    /// Handed to event stream followers so they end with the server.
    pub cancel: CancellationToken,
}

pub struct ApiServer {
    addr: SocketAddr,
    state: Arc<ApiState>,
}

impl ApiServer {
    pub fn new(addr: SocketAddr, config: ApiConfig, service: Arc<LedgerService>, cancel: CancellationToken) -> Self {
        Self {
            addr,
            state: Arc::new(ApiState {
                service,
                config,
                started: Instant::now(),
                cancel,
            }),
        }
    }

    pub fn router(&self) -> Router {
        let config = &self.state.config;
        let mut router = Router::new()
            .route("/health", get(handlers::health))
            .route("/epoch", get(handlers::epoch))
            .route("/pool", get(handlers::pool))
            .route("/audit", get(handlers::audit))
            .route("/nodes", get(handlers::list_nodes))
            .route("/nodes/:addr", get(handlers::get_node))
            .route("/accounts/:addr", get(handlers::get_account))
            .route("/chips/:id", get(handlers::get_chip))
            .route("/unstake/:id", get(handlers::get_unstake))
            .route("/withdrawals/:id", get(handlers::get_withdrawal))
            .route("/events", get(handlers::list_events))
            .route("/events/stream", get(handlers::stream_events))
            .route("/tx", post(handlers::submit_tx))
            .layer(DefaultBodyLimit::max(config.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
            .layer(TraceLayer::new_for_http());

        if config.cors_enabled {
            router = router.layer(cors_layer(&config.cors_origins));
        }

        router.with_state(Arc::clone(&self.state))
    }

    pub async fn serve(self, mut shutdown: CancellationToken) -> ChipstakeResult<()> {
        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|e| ChipstakeError::Network(format!("Failed to bind API server: {}", e)))?;

        let local = listener
            .local_addr()
            .map_err(|e| ChipstakeError::Network(format!("Failed to read bound address: {}", e)))?;
        info!("API server listening on http://{}", local);
        if !self.state.config.submit_enabled {
            info!("Transaction submission disabled; API is read-only");
        }

        let app = self.router();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(|e| ChipstakeError::Network(format!("API server error: {}", e)))?;

        info!("API server stopped");
        Ok(())
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(parsed))
}
