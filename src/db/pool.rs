use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;

use crate::config::Config;

/// Open the Postgres pool described by `config`, or `None` when no database is configured.
pub async fn get_db_pool(config: &Config) -> Result<Option<Pool<Postgres>>, sqlx::Error> {
    let Some(database_url) = config.database_url.as_deref() else {
        return Ok(None);
    };
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .min_connections(1)
        .idle_timeout(Duration::from_secs(30))
        .connect(database_url)
        .await?;
    Ok(Some(pool))
}
