use axum::{Extension, Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};

use crate::{
    entity::sea_orm_active_enums::ConversionStatus,
    error::ApiError,
    ledger,
    middleware::auth::AppUser,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/conversion", post(advance_conversion))
        .route("/group-joined", post(group_joined))
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConversionRequest {
    pub user_id: String,
    pub status: ConversionStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct LifecycleResponse {
    pub updated: u64,
}

/// Funnel-stage signal from an external lifecycle collaborator (camp
/// enrollment, partner upgrade). Forward-only; replays are no-ops.
#[tracing::instrument(name = "POST /referrals/conversion", skip(state, user, payload))]
pub async fn advance_conversion(
    State(state): State<AppState>,
    Extension(user): Extension<AppUser>,
    Json(payload): Json<ConversionRequest>,
) -> Result<Json<LifecycleResponse>, ApiError> {
    user.require_role("service")?;

    let updated =
        ledger::referrals::advance_conversion(&state.db, &payload.user_id, payload.status).await?;
    Ok(Json(LifecycleResponse { updated }))
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupJoinedRequest {
    pub user_id: String,
}

#[tracing::instrument(name = "POST /referrals/group-joined", skip(state, user, payload))]
pub async fn group_joined(
    State(state): State<AppState>,
    Extension(user): Extension<AppUser>,
    Json(payload): Json<GroupJoinedRequest>,
) -> Result<Json<LifecycleResponse>, ApiError> {
    user.require_role("service")?;

    let updated = ledger::referrals::mark_group_joined(&state.db, &payload.user_id).await?;
    Ok(Json(LifecycleResponse { updated }))
}
