use std::sync::Arc;

use axum::{Router, middleware::from_fn_with_state};
use middleware::auth::auth_middleware;
use state::State;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, decompression::RequestDecompressionLayer,
};

pub mod cas;
pub mod entity;
pub mod error;
pub mod events;
pub mod ledger;
pub mod settings;
pub mod state;

mod middleware;
mod routes;

pub mod auth {
    pub use crate::middleware::auth::{AppUser, JwtKey};
}

pub use axum;
pub use sea_orm;

pub fn construct_router(state: Arc<State>) -> Router {
    let router = Router::new()
        .nest("/health", routes::health::routes())
        .nest("/codes", routes::codes::routes())
        .nest("/orders", routes::orders::routes())
        .nest("/referrals", routes::referrals::routes())
        .nest("/partners", routes::partners::routes())
        .nest("/admin", routes::admin::routes())
        .with_state(state.clone())
        .layer(from_fn_with_state(state, auth_middleware))
        .layer(CorsLayer::permissive())
        .layer(
            ServiceBuilder::new()
                .layer(RequestDecompressionLayer::new())
                .layer(CompressionLayer::new()),
        );

    Router::new().nest("/api/v1", router)
}
