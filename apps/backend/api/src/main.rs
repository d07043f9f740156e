#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::{sync::Arc, time::Duration};

use bloom_api::{construct_router, ledger, state::State};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting Bloom partner ledger API");

    let config = config::Config::from_env()?;
    let state = Arc::new(State::new().await);

    spawn_maturation_sweep(state.clone(), &config);

    let app = construct_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// The only background job: periodically flips due pending commissions to
/// confirmed, in bounded batches. Every row transition is individually
/// guarded, so an abort mid-pass leaves nothing half-matured.
fn spawn_maturation_sweep(state: Arc<State>, config: &config::Config) {
    let interval = Duration::from_secs(config.sweep_interval_secs);
    let batch_size = config.sweep_batch_size;

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match ledger::commissions::mature_due(&state.db, &state.events, batch_size).await {
                Ok(0) => {}
                Ok(confirmed) => {
                    tracing::info!(confirmed, "Maturation sweep pass finished");
                }
                Err(err) => {
                    tracing::error!("Maturation sweep failed: {}", err);
                }
            }
        }
    });
}
