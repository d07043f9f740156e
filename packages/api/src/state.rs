use std::{sync::Arc, time::Duration};

use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use crate::{
    events::{DynEventPublisher, TracingPublisher},
    middleware::auth::JwtKey,
    settings::Settings,
};

pub type AppState = Arc<State>;

pub struct State {
    pub db: DatabaseConnection,
    pub settings: Settings,
    pub events: DynEventPublisher,
    pub jwt: JwtKey,
}

impl State {
    pub async fn new() -> Self {
        let settings = Settings::from_env().expect("Failed to load ledger settings");
        let jwt = JwtKey::from_env().expect("Failed to load the JWT verification key");

        let db_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let mut opt = ConnectOptions::new(db_url);
        opt.max_connections(10)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(8));

        let db = Database::connect(opt)
            .await
            .expect("Failed to connect to database");

        Self {
            db,
            settings,
            events: Arc::new(TracingPublisher),
            jwt,
        }
    }

    /// State with an explicit connection and publisher, for binaries that
    /// wire their own backends.
    pub fn with_backends(
        db: DatabaseConnection,
        settings: Settings,
        events: DynEventPublisher,
        jwt: JwtKey,
    ) -> Self {
        Self {
            db,
            settings,
            events,
            jwt,
        }
    }
}
