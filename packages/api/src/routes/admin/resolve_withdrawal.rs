use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::Deserialize;

use crate::{
    entity::withdrawal_request,
    error::ApiError,
    events::PlatformEvent,
    ledger::{self, withdrawals::Decision},
    middleware::auth::AppUser,
    state::AppState,
};

#[derive(Debug, Clone, Deserialize)]
pub struct ResolveWithdrawalRequest {
    pub decision: Decision,
}

#[tracing::instrument(
    name = "POST /admin/withdrawals/{request_id}/resolve",
    skip(state, user, payload)
)]
pub async fn resolve_withdrawal(
    State(state): State<AppState>,
    Extension(user): Extension<AppUser>,
    Path(request_id): Path<String>,
    Json(payload): Json<ResolveWithdrawalRequest>,
) -> Result<Json<withdrawal_request::Model>, ApiError> {
    user.require_role("admin")?;
    let admin_id = user.sub()?;

    let resolved =
        ledger::withdrawals::resolve(&state.db, &request_id, payload.decision, &admin_id).await?;

    state
        .events
        .publish(PlatformEvent::WithdrawalResolved {
            request_id: resolved.id.clone(),
            partner_id: resolved.partner_id.clone(),
            amount: resolved.amount,
            status: resolved.status,
        })
        .await;

    Ok(Json(resolved))
}
