//! Score persistence.
//!
//! Each page key owns one sorted collection whose members are visitor
//! identifiers scored by their cumulative claps. Reads are a full range scan
//! with scores; writes are a single atomic increment-by-delta on one member.

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use std::{
    collections::{BTreeMap, HashMap},
    sync::atomic::{AtomicBool, Ordering},
};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// One (visitor, score) member of a page's collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreEntry {
    pub visitor: String,
    pub score: u64,
}

#[async_trait]
pub trait ScoreStore: Send + Sync {
    /// All entries recorded under `key`. A missing key is an empty list.
    async fn scores(&self, key: &str) -> Result<Vec<ScoreEntry>, StoreError>;

    /// Atomically adds `delta` to `visitor`'s score under `key`, creating the
    /// entry when absent, and returns the new score.
    async fn increment(&self, key: &str, visitor: &str, delta: u64) -> Result<u64, StoreError>;
}

/// Redis sorted sets (`ZRANGE ... WITHSCORES` / `ZINCRBY`).
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = Client::open(redis_url)?;
        let connection = client.get_connection_manager().await?;
        info!("connected to redis");
        Ok(Self { connection })
    }
}

#[async_trait]
impl ScoreStore for RedisStore {
    async fn scores(&self, key: &str) -> Result<Vec<ScoreEntry>, StoreError> {
        let mut connection = self.connection.clone();
        let members: Vec<(String, f64)> = connection.zrange_withscores(key, 0, -1).await?;
        Ok(members
            .into_iter()
            .map(|(visitor, score)| ScoreEntry {
                visitor,
                score: score_from_redis(score),
            })
            .collect())
    }

    async fn increment(&self, key: &str, visitor: &str, delta: u64) -> Result<u64, StoreError> {
        let mut connection = self.connection.clone();
        let score: f64 = connection.zincr(key, visitor, delta).await?;
        Ok(score_from_redis(score))
    }
}

// Sorted-set scores are doubles; only whole non-negative values are ever written.
fn score_from_redis(score: f64) -> u64 {
    if score.is_finite() && score > 0.0 {
        score.round() as u64
    } else {
        0
    }
}

/// In-process store used when no Redis URL is configured, and by tests.
#[derive(Default)]
pub struct MemoryStore {
    pages: Mutex<HashMap<String, BTreeMap<String, u64>>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail, to exercise outage handling.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store switched off".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ScoreStore for MemoryStore {
    async fn scores(&self, key: &str) -> Result<Vec<ScoreEntry>, StoreError> {
        self.check_available()?;
        let pages = self.pages.lock().await;
        Ok(pages
            .get(key)
            .map(|members| {
                members
                    .iter()
                    .map(|(visitor, score)| ScoreEntry {
                        visitor: visitor.clone(),
                        score: *score,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn increment(&self, key: &str, visitor: &str, delta: u64) -> Result<u64, StoreError> {
        self.check_available()?;
        let mut pages = self.pages.lock().await;
        let score = pages
            .entry(key.to_string())
            .or_default()
            .entry(visitor.to_string())
            .or_default();
        *score = score.saturating_add(delta);
        Ok(*score)
    }
}
