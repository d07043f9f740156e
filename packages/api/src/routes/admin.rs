//! Administrative routes: code batch generation and withdrawal resolution.
//! Both require the `admin` role from the external authorization provider.

use axum::{Router, routing::post};

use crate::state::AppState;

pub mod generate_codes;
pub mod resolve_withdrawal;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/codes/generate", post(generate_codes::generate_codes))
        .route(
            "/withdrawals/{request_id}/resolve",
            post(resolve_withdrawal::resolve_withdrawal),
        )
}
