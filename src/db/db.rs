// db/db.rs
use std::sync::Arc;

use redis::aio::ConnectionManager;
use sqlx::{Pool, Postgres};

#[derive(Clone)]
pub struct DBClient {
    pub pool: Pool<Postgres>,
    pub redis_client: Option<Arc<ConnectionManager>>,
}

impl std::fmt::Debug for DBClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DBClient")
            .field("pool", &"Pool<Postgres>")
            .field("redis_client", &self.redis_client.is_some())
            .finish()
    }
}

impl DBClient {
    pub fn new(pool: Pool<Postgres>) -> Self {
        DBClient {
            pool,
            redis_client: None,
        }
    }

    /// Attaches redis when reachable; a dead redis degrades to Postgres only.
    pub async fn with_redis(pool: Pool<Postgres>, redis_url: &str) -> Self {
        let client = match redis::Client::open(redis_url) {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!("Failed to create Redis client: {}. Continuing without it.", e);
                return Self::new(pool);
            }
        };

        match ConnectionManager::new(client).await {
            Ok(conn) => {
                tracing::info!("Redis connection established");
                DBClient {
                    pool,
                    redis_client: Some(Arc::new(conn)),
                }
            }
            Err(e) => {
                tracing::warn!("Failed to connect to Redis: {}. Continuing without it.", e);
                Self::new(pool)
            }
        }
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    pub fn cache_status(&self) -> &'static str {
        if self.redis_client.is_some() {
            "enabled"
        } else {
            "disabled"
        }
    }
}
