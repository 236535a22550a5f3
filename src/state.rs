use crate::config::Config;
use crate::counter::CounterService;
use crate::storage::{MemoryStore, RedisStore, ScoreStore, StoreError};
use std::sync::Arc;
use tracing::warn;

/// Shared by every request. Built once; the store handle is never re-created per request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub counter: Arc<CounterService>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn ScoreStore>) -> Self {
        let counter = CounterService::new(store, config.max_score);
        Self {
            config: Arc::new(config),
            counter: Arc::new(counter),
        }
    }

    /// Picks Redis when a URL is configured, otherwise an in-process store.
    pub async fn connect(config: Config) -> Result<Self, StoreError> {
        let store: Arc<dyn ScoreStore> = match config.redis_url.as_deref() {
            Some(url) => Arc::new(RedisStore::connect(url).await?),
            None => {
                warn!("REDIS_URL not set, claps are kept in memory and lost on restart");
                Arc::new(MemoryStore::new())
            }
        };
        Ok(Self::new(config, store))
    }
}
