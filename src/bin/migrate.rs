use nexus_storefront::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    middleware::session::create_session_store,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;
    create_session_store(&pool).await?;
    println!("Migrations applied");
    Ok(())
}
