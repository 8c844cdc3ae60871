use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::config::get_config;
use crate::error::Result;

pub async fn create_pool() -> Result<PgPool> {
    let config = get_config();
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&config.database_url)
        .await?;
    tracing::info!("Database pool ready");
    Ok(pool)
}
