use axum::{Extension, Json, Router, extract::State, routing::post};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    entity::{commission, sea_orm_active_enums::ConversionStatus},
    error::ApiError,
    ledger::{self, commissions::OrderEvent},
    middleware::auth::AppUser,
    state::AppState,
};

/// Order type that also marks the buyer's funnel stage as a 365 purchase.
const ORDER_TYPE_365: &str = "purchase_365";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/settled", post(order_settled))
        .route("/cancelled", post(order_cancelled))
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderSettledRequest {
    pub order_id: String,
    pub order_type: String,
    pub order_amount: Decimal,
    pub buyer_user_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderSettledResponse {
    pub order_id: String,
    pub commissions: Vec<commission::Model>,
}

/// Idempotent settlement notification from the order/payment collaborator.
/// Safe to redeliver: the ledger creates at most one commission per
/// (order, level).
#[tracing::instrument(name = "POST /orders/settled", skip(state, user, payload))]
pub async fn order_settled(
    State(state): State<AppState>,
    Extension(user): Extension<AppUser>,
    Json(payload): Json<OrderSettledRequest>,
) -> Result<Json<OrderSettledResponse>, ApiError> {
    user.require_role("service")?;

    let event = OrderEvent {
        order_id: payload.order_id.clone(),
        order_type: payload.order_type.clone(),
        order_amount: payload.order_amount,
        buyer_user_id: payload.buyer_user_id.clone(),
    };
    let commissions = ledger::commissions::record_order(
        &state.db,
        &state.settings.rate_table,
        state.settings.maturation_window(),
        event,
    )
    .await?;

    if payload.order_type == ORDER_TYPE_365 {
        ledger::referrals::advance_conversion(
            &state.db,
            &payload.buyer_user_id,
            ConversionStatus::Purchased365,
        )
        .await?;
    }

    Ok(Json(OrderSettledResponse {
        order_id: payload.order_id,
        commissions,
    }))
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderCancelledRequest {
    pub order_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderCancelledResponse {
    pub order_id: String,
    pub cancelled: u64,
}

/// Idempotent refund/chargeback notification. Cancels still-pending
/// commissions; confirmed ones are out of scope for cancellation.
#[tracing::instrument(name = "POST /orders/cancelled", skip(state, user, payload))]
pub async fn order_cancelled(
    State(state): State<AppState>,
    Extension(user): Extension<AppUser>,
    Json(payload): Json<OrderCancelledRequest>,
) -> Result<Json<OrderCancelledResponse>, ApiError> {
    user.require_role("service")?;

    let cancelled = ledger::commissions::cancel_order(&state.db, &payload.order_id).await?;

    Ok(Json(OrderCancelledResponse {
        order_id: payload.order_id,
        cancelled,
    }))
}
