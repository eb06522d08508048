use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::app::AppState;

/// GET /health — liveness probe. Reports process metadata and whether the
/// identity store is reachable; does not reach out to upstream providers
/// (that connectivity probe is a sidecar concern, not part of the core).
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let storage_ok = state.identities.iter().is_ok();
    Json(json!({
        "status": if storage_ok { "ok" } else { "degraded" },
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
