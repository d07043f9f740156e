use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use rust_decimal::Decimal;
use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};

use crate::{
    entity::{partner, withdrawal_request},
    error::ApiError,
    ledger::{self, funnel::FunnelReport, withdrawals::SubmitWithdrawal},
    middleware::auth::AppUser,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/{partner_id}/balance", get(get_balance))
        .route("/{partner_id}/funnel", get(get_funnel))
        .route("/{partner_id}/withdrawals", post(submit_withdrawal))
}

/// Partners may only see and spend their own ledger; admins see all.
async fn authorize_partner(
    state: &AppState,
    user: &AppUser,
    partner_id: &str,
) -> Result<partner::Model, ApiError> {
    let partner = partner::Entity::find_by_id(partner_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Partner not found"))?;

    let sub = user.sub()?;
    if sub != partner.user_id && !user.has_role("admin") {
        return Err(ApiError::forbidden("Not your partner account"));
    }
    Ok(partner)
}

#[derive(Debug, Clone, Serialize)]
pub struct BalanceResponse {
    pub partner_id: String,
    pub confirmed_total: Decimal,
    pub reserved_total: Decimal,
    pub available_balance: Decimal,
}

#[tracing::instrument(name = "GET /partners/{partner_id}/balance", skip(state, user))]
pub async fn get_balance(
    State(state): State<AppState>,
    Extension(user): Extension<AppUser>,
    Path(partner_id): Path<String>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let partner = authorize_partner(&state, &user, &partner_id).await?;
    let balance = ledger::balance::available_balance(&state.db, &partner.id).await?;

    Ok(Json(BalanceResponse {
        partner_id: partner.id,
        confirmed_total: balance.confirmed_total,
        reserved_total: balance.reserved_total,
        available_balance: balance.available,
    }))
}

#[tracing::instrument(name = "GET /partners/{partner_id}/funnel", skip(state, user))]
pub async fn get_funnel(
    State(state): State<AppState>,
    Extension(user): Extension<AppUser>,
    Path(partner_id): Path<String>,
) -> Result<Json<FunnelReport>, ApiError> {
    let partner = authorize_partner(&state, &user, &partner_id).await?;
    let report = ledger::funnel::funnel_report(&state.db, &partner.id).await?;
    Ok(Json(report))
}

#[derive(Debug, Clone, Deserialize)]
pub struct WithdrawalRequestBody {
    pub amount: Decimal,
    pub payment_method: String,
    pub payment_info: serde_json::Value,
}

#[tracing::instrument(name = "POST /partners/{partner_id}/withdrawals", skip(state, user, payload))]
pub async fn submit_withdrawal(
    State(state): State<AppState>,
    Extension(user): Extension<AppUser>,
    Path(partner_id): Path<String>,
    Json(payload): Json<WithdrawalRequestBody>,
) -> Result<Json<withdrawal_request::Model>, ApiError> {
    let partner = authorize_partner(&state, &user, &partner_id).await?;

    let request = ledger::withdrawals::submit(
        &state.db,
        &partner.id,
        SubmitWithdrawal {
            amount: payload.amount,
            payment_method: payload.payment_method,
            payment_info: payload.payment_info,
        },
    )
    .await?;

    Ok(Json(request))
}
