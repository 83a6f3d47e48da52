use tower_sessions::{
    Expiry, SessionManagerLayer,
    cookie::{SameSite, time::Duration},
};
use tower_sessions_sqlx_store::PostgresStore;

use crate::{config::AppConfig, db::DbPool};

pub const SESSION_COOKIE: &str = "nexus_session";
pub const SESSION_INACTIVITY_DAYS: i64 = 7;

/// Create the session store and its table.
pub async fn create_session_store(pool: &DbPool) -> anyhow::Result<PostgresStore> {
    let store = PostgresStore::new(pool.clone());
    store.migrate().await?;
    Ok(store)
}

pub fn session_layer(store: PostgresStore, config: &AppConfig) -> SessionManagerLayer<PostgresStore> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE)
        .with_path("/")
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_secure(config.is_secure())
        .with_expiry(Expiry::OnInactivity(Duration::days(SESSION_INACTIVITY_DAYS)))
}
