use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use crate::auth::{jwt::TokenIssuer, password::PasswordHasher, services::AuthService};
use crate::config::AppConfig;
use crate::users::{
    memory::MemoryUserStore, pg::PgUserStore, repo::UserStore, services::UserService,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth: AuthService,
    pub users: UserService,
}

impl AppState {
    /// Connects to PostgreSQL and runs migrations when `DATABASE_URL` is set,
    /// otherwise falls back to the in-memory store.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn UserStore> = match &config.database_url {
            Some(url) => {
                let db = PgPoolOptions::new()
                    .max_connections(config.max_connections)
                    .connect(url)
                    .await
                    .context("connect to database")?;
                sqlx::migrate!("./migrations")
                    .run(&db)
                    .await
                    .context("run migrations")?;
                info!("using postgres user store");
                Arc::new(PgUserStore::new(db))
            }
            None => {
                warn!("DATABASE_URL not set; users are kept in memory and lost on restart");
                Arc::new(MemoryUserStore::new())
            }
        };
        Self::from_parts(config, store)
    }

    pub fn from_parts(config: AppConfig, store: Arc<dyn UserStore>) -> anyhow::Result<Self> {
        let hasher = PasswordHasher::new(&config.hasher)?;
        let tokens = TokenIssuer::new(&config.jwt);
        Ok(Self {
            auth: AuthService::new(store.clone(), hasher.clone(), tokens),
            users: UserService::new(store, hasher),
            config: Arc::new(config),
        })
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        Self::from_parts(AppConfig::fake(), Arc::new(MemoryUserStore::new()))
            .expect("fake state")
    }
}
