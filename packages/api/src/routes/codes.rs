use axum::{
    Extension, Json, Router,
    extract::State,
    routing::post,
};
use sea_orm::{EntityTrait, TransactionTrait};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    entity::{partner, redemption_code, referral, sea_orm_active_enums::EntryType},
    error::ApiError,
    events::PlatformEvent,
    ledger::{self, error::LedgerError},
    middleware::auth::AppUser,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/redeem", post(redeem))
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RedeemRequest {
    pub code: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RedeemResponse {
    pub success: bool,
    pub referral_id: String,
    pub partner_code: String,
    pub entry_type: EntryType,
    pub quota_amount: i32,
}

/// Claim and referral creation run in one transaction: a claimant who turns
/// out to be already referred rolls back the code consumption, so losers of
/// any of the races never leave a half-applied redemption behind.
#[utoipa::path(
    post,
    path = "/codes/redeem",
    tag = "codes",
    request_body = RedeemRequest,
    responses(
        (status = 200, description = "Code redeemed, referral created", body = RedeemResponse),
        (status = 409, description = "Code already redeemed, or user already referred"),
        (status = 410, description = "Code expired"),
        (status = 404, description = "Unknown code")
    )
)]
#[tracing::instrument(name = "POST /codes/redeem", skip(state, user, payload))]
pub async fn redeem(
    State(state): State<AppState>,
    Extension(user): Extension<AppUser>,
    Json(payload): Json<RedeemRequest>,
) -> Result<Json<RedeemResponse>, ApiError> {
    let sub = user.sub()?;
    if sub != payload.user_id && !user.has_role("service") {
        return Err(ApiError::forbidden("Cannot redeem a code for another user"));
    }

    let code_input = payload.code.trim().to_string();
    if code_input.is_empty() {
        return Err(ApiError::bad_request("Code must not be empty"));
    }

    let user_id = payload.user_id.clone();
    let code_key = code_input.clone();
    let outcome = state
        .db
        .transaction::<_, (redemption_code::Model, Vec<referral::Model>), LedgerError>(|txn| {
            Box::pin(async move {
                let code = ledger::codes::claim(txn, &code_input, &user_id).await?;
                let referrals = ledger::referrals::record_claim(txn, &code, &user_id).await?;
                Ok((code, referrals))
            })
        })
        .await
        .map_err(LedgerError::from);

    let (code, referrals) = match outcome {
        Ok(pair) => pair,
        Err(err) => {
            // The rollback also undoes any write the claim issued on the
            // transaction, so the expiry transition is re-applied on the
            // pool where it can stick.
            if ledger::codes::requires_expiry_mark(&err) {
                ledger::codes::mark_expired(&state.db, &code_key).await?;
            }
            return Err(err.into());
        }
    };

    let owning_partner = partner::Entity::find_by_id(&code.partner_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Partner not found"))?;

    for referral in &referrals {
        state
            .events
            .publish(PlatformEvent::ReferralCreated {
                referral_id: referral.id.clone(),
                partner_id: referral.partner_id.clone(),
                referred_user_id: referral.referred_user_id.clone(),
                level: referral.level,
            })
            .await;
    }

    // record_claim always returns the level-1 edge first.
    let level1 = referrals
        .first()
        .ok_or_else(|| ApiError::internal("Redemption created no referral"))?;

    Ok(Json(RedeemResponse {
        success: true,
        referral_id: level1.id.clone(),
        partner_code: owning_partner.partner_code,
        entry_type: code.entry_type,
        quota_amount: code.quota_amount,
    }))
}
