use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Derived view of a page's claps, as returned by both GET and PATCH.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Aggregate {
    pub total_score: u64,
    pub user_score: u64,
    pub total_users: u64,
    #[serde(rename = "maxClaps", default)]
    pub max_score: u64,
}

/// PATCH body. `score` stays untyped so junk input can be coerced instead of rejected.
#[derive(Debug, Deserialize, Default)]
pub struct IncrementRequest {
    #[serde(default)]
    pub score: Option<Value>,
    #[serde(default)]
    pub key: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct KeyQuery {
    pub key: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}
