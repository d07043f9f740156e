use axum::{Extension, Json, extract::State};
use rust_decimal::Decimal;
use sea_orm::EntityTrait;
use serde::Deserialize;

use crate::{
    entity::{partner, redemption_code, sea_orm_active_enums::EntryType},
    error::ApiError,
    ledger::{self, codes::GenerateBatch},
    middleware::auth::AppUser,
    state::AppState,
};

/// Largest batch one request may mint. Bigger campaigns go out as several
/// batches under the same batch name.
const MAX_BATCH_SIZE: usize = 5000;

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateCodesRequest {
    pub batch_name: String,
    pub partner_id: String,
    pub count: usize,
    pub prefix: Option<String>,
    pub source_channel: Option<String>,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub entry_type: Option<EntryType>,
    #[serde(default)]
    pub quota_amount: Option<i32>,
    #[serde(default)]
    pub entry_price: Option<Decimal>,
}

#[axum::debug_handler]
pub async fn generate_codes(
    State(state): State<AppState>,
    Extension(user): Extension<AppUser>,
    Json(payload): Json<GenerateCodesRequest>,
) -> Result<Json<Vec<redemption_code::Model>>, ApiError> {
    user.require_role("admin")?;

    if payload.count == 0 || payload.count > MAX_BATCH_SIZE {
        return Err(ApiError::bad_request(format!(
            "count must be between 1 and {}",
            MAX_BATCH_SIZE
        )));
    }
    if payload.batch_name.trim().is_empty() {
        return Err(ApiError::bad_request("batch_name must not be empty"));
    }

    let owning_partner = partner::Entity::find_by_id(&payload.partner_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Partner not found"))?;
    if !owning_partner.is_active {
        return Err(ApiError::conflict("Partner is deactivated"));
    }

    let entry_type = payload.entry_type.unwrap_or(EntryType::Free);
    let entry_price = match entry_type {
        EntryType::Free => Decimal::ZERO,
        EntryType::Paid => payload
            .entry_price
            .ok_or_else(|| ApiError::bad_request("entry_price is required for paid codes"))?,
    };

    let batch = GenerateBatch {
        batch_name: payload.batch_name,
        partner_id: owning_partner.id,
        count: payload.count,
        prefix: payload.prefix,
        source_channel: payload.source_channel,
        expires_at: payload.expires_at.map(|t| t.naive_utc()),
        entry_type,
        quota_amount: payload
            .quota_amount
            .unwrap_or(state.settings.default_code_quota),
        entry_price,
    };

    let codes = ledger::codes::generate_batch(&state.db, batch).await?;
    Ok(Json(codes))
}
