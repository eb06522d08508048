use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use agentgate_core::GatewayConfig;
use agentgate_identity::{IdentityStore, RateLimiter};
use agentgate_memory::SentimentScorer;

/// Central shared state, passed as `Arc<AppState>` to every handler.
pub struct AppState {
    pub config: GatewayConfig,
    pub identities: IdentityStore,
    pub rate_limiter: RateLimiter,
    pub sentiment: SentimentScorer,
}

impl AppState {
    pub fn new(config: GatewayConfig, identities: IdentityStore) -> Self {
        Self {
            config,
            identities,
            rate_limiter: RateLimiter::new(),
            sentiment: SentimentScorer::default(),
        }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/v1/chat", post(crate::http::chat::chat_handler))
        .route("/v1/identity", get(crate::http::admin::identity_handler))
        .route("/v1/admin/tier", post(crate::http::admin::tier_update_handler))
        .route("/v1/admin/stats", get(crate::http::admin::stats_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
