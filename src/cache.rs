//! Redis cache for the full food listing.
//!
//! Failures never reach the client: they are logged and the caller falls back
//! to the database.

use std::ops::DerefMut;
use std::time::Duration;

use r2d2_redis::r2d2;
use r2d2_redis::redis::{Commands, RedisError};
use r2d2_redis::RedisConnectionManager;
use thiserror::Error;

use crate::config::CacheConfig;
use crate::models::Food;

pub type RedisPool = r2d2::Pool<RedisConnectionManager>;

const ALL_FOODS_KEY: &str = "foods:all";
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] RedisError),

    #[error("redis pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("cached payload is unreadable: {0}")]
    Payload(#[from] serde_json::Error),
}

#[derive(Clone)]
pub struct FoodCache {
    pool: RedisPool,
    ttl_seconds: usize,
}

impl FoodCache {
    pub fn connect(config: &CacheConfig) -> Result<Self, CacheError> {
        let manager = RedisConnectionManager::new(config.url.as_str())?;
        let pool = r2d2::Pool::builder()
            .max_size(config.pool_max_open)
            .min_idle(Some(config.pool_min_idle))
            .max_lifetime(Some(config.pool_max_lifetime))
            .connection_timeout(CONNECTION_TIMEOUT)
            .build(manager)?;

        Ok(Self {
            pool,
            ttl_seconds: config.ttl_seconds,
        })
    }

    /// The cached listing, or `None` on a miss or any cache failure.
    pub fn get_all(&self) -> Option<Vec<Food>> {
        match self.try_get_all() {
            Ok(hit) => hit,
            Err(e) => {
                log::warn!("food cache read failed: {e}");
                None
            }
        }
    }

    pub fn put_all(&self, foods: &[Food]) {
        if let Err(e) = self.try_put_all(foods) {
            log::warn!("food cache write failed: {e}");
        }
    }

    pub fn invalidate(&self) {
        if let Err(e) = self.try_invalidate() {
            log::warn!("food cache invalidation failed: {e}");
        }
    }

    fn try_get_all(&self) -> Result<Option<Vec<Food>>, CacheError> {
        let mut conn = self.pool.get()?;
        let cached: Option<String> = conn.deref_mut().get(ALL_FOODS_KEY)?;
        match cached {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    fn try_put_all(&self, foods: &[Food]) -> Result<(), CacheError> {
        let payload = serde_json::to_string(foods)?;
        let mut conn = self.pool.get()?;
        let _: () = conn.deref_mut().set_ex(ALL_FOODS_KEY, payload, self.ttl_seconds)?;
        Ok(())
    }

    fn try_invalidate(&self) -> Result<(), CacheError> {
        let mut conn = self.pool.get()?;
        let _: () = conn.deref_mut().del(ALL_FOODS_KEY)?;
        Ok(())
    }
}
