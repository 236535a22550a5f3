//! The accumulation rule: a per-visitor, per-page score capped at a maximum.
//!
//! `increment` reads the visitor's current score, clamps the requested delta
//! to the remaining headroom and then relies on the store's atomic add. The
//! read and the add are not one transaction, so two in-flight increments for
//! the same visitor can overshoot the cap by at most one delta. Different
//! visitors never lose each other's updates.

use crate::aggregate::build_aggregate;
use crate::models::Aggregate;
use crate::storage::{ScoreStore, StoreError};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum CounterError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("clap limit of {max} reached")]
    LimitExceeded { max: u64 },

    #[error("score store unavailable: {0}")]
    ServiceUnavailable(#[from] StoreError),
}

/// Coerces a requested delta. Anything negative, fractional below one,
/// non-finite or non-numeric becomes zero; numeric strings are accepted.
pub fn coerce_delta(value: Option<&Value>) -> u64 {
    let number = match value {
        Some(Value::Number(number)) => {
            if let Some(whole) = number.as_u64() {
                return whole;
            }
            number.as_f64()
        }
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        _ => None,
    };

    match number {
        Some(number) if number.is_finite() && number >= 1.0 => number.floor() as u64,
        _ => 0,
    }
}

pub struct CounterService {
    store: Arc<dyn ScoreStore>,
    max_score: u64,
}

impl CounterService {
    pub fn new(store: Arc<dyn ScoreStore>, max_score: u64) -> Self {
        Self { store, max_score }
    }

    /// Side-effect free. A page nobody has clapped for reads as zeros.
    pub async fn read(&self, page_key: &str, visitor: &str) -> Result<Aggregate, CounterError> {
        let entries = self.store.scores(page_key).await?;
        Ok(build_aggregate(&entries, visitor, self.max_score))
    }

    pub async fn increment(
        &self,
        page_key: &str,
        visitor: &str,
        requested: u64,
    ) -> Result<Aggregate, CounterError> {
        let current = self.read(page_key, visitor).await?.user_score;
        if current >= self.max_score {
            return Err(CounterError::LimitExceeded {
                max: self.max_score,
            });
        }

        let applied = requested.min(self.max_score - current);
        if applied > 0 {
            let score = self.store.increment(page_key, visitor, applied).await?;
            debug!(page_key, requested, applied, score, "claps recorded");
        }

        self.read(page_key, visitor).await
    }
}
