use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use agentgate_core::Tier;
use agentgate_identity::types::IdentityAdminProjection;

use crate::app::AppState;
use crate::error::GatewayError;
use crate::http::chat::extract_api_key;

/// GET /v1/identity — public projection for the identity behind the
/// presented key, including `traits` (§4.7). Never returns memory contents
/// or the fingerprint itself.
pub async fn identity_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<IdentityAdminProjection>, GatewayError> {
    let key = extract_api_key(&headers).ok_or(GatewayError::AuthMissing)?;
    let fp = state.identities.fingerprint(&key);
    let identity = state.identities.load(&fp)?.ok_or(GatewayError::NotFound)?;
    Ok(Json(IdentityAdminProjection::from(&identity)))
}

#[derive(Deserialize)]
pub struct TierUpdateRequest {
    pub fingerprint: String,
    pub tier: String,
    #[serde(default)]
    pub billing_customer_id: Option<String>,
}

#[derive(Serialize)]
pub struct TierUpdateResponse {
    pub ok: bool,
    pub tier: String,
}

/// POST /v1/admin/tier — the sole legitimate mutator of `tier`. Does not
/// require the raw upstream key, only the already-derived fingerprint.
pub async fn tier_update_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TierUpdateRequest>,
) -> Result<Json<TierUpdateResponse>, GatewayError> {
    let fp = body.fingerprint.clone().into();
    let mut identity = state.identities.load(&fp)?.ok_or(GatewayError::NotFound)?;

    let tier = Tier::from_str(&body.tier).map_err(|_| GatewayError::ValidationError)?;
    identity.tier = tier;
    if body.billing_customer_id.is_some() {
        identity.billing_customer_id = body.billing_customer_id;
    }
    state.identities.save(&identity)?;

    Ok(Json(TierUpdateResponse {
        ok: true,
        tier: identity.tier.to_string(),
    }))
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub total_identities: usize,
    pub total_calls: u64,
    pub tier_breakdown: HashMap<String, usize>,
}

/// GET /v1/admin/stats — population by tier and total calls, computed via
/// a snapshot iteration over the identity store.
pub async fn stats_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatsResponse>, GatewayError> {
    let identities = state.identities.iter()?;

    // §6: tierBreakdown always carries all four keys, even tiers with zero
    // population, so a client reading e.g. `tierBreakdown.enterprise` never
    // finds it missing.
    let mut tier_breakdown: HashMap<String, usize> = [Tier::Free, Tier::Pro, Tier::Team, Tier::Enterprise]
        .into_iter()
        .map(|t| (t.to_string(), 0))
        .collect();
    let mut total_calls = 0u64;
    for identity in &identities {
        *tier_breakdown.entry(identity.tier.to_string()).or_insert(0) += 1;
        total_calls += identity.calls_total;
    }

    Ok(Json(StatsResponse {
        total_identities: identities.len(),
        total_calls,
        tier_breakdown,
    }))
}
