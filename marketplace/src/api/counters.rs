//! Badge counters: GET /api/counters.

use super::failure;
use crate::auth::AuthUser;
use crate::server::state::AppState;
use axum::{Json, extract::State};
use rental_market_core::types::Counters;
use rental_market_web::WebResult;

/// Every counter applicable to the caller, recomputed on each call.
///
/// `pending_listings` is only present for admins.
pub async fn get_counters(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
) -> WebResult<Json<Counters>> {
    let counters = state
        .counters
        .for_actor(actor)
        .await
        .map_err(failure(&state, "counters", Some(actor.id)))?;
    Ok(Json(counters))
}
