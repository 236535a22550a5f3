pub mod aggregate;
pub mod app;
pub mod client;
pub mod config;
pub mod counter;
pub mod errors;
pub mod handlers;
pub mod identity;
pub mod models;
pub mod state;
pub mod storage;
pub mod ui;
pub mod widget;

pub use app::router;
pub use client::HttpCounterClient;
pub use config::Config;
pub use counter::{CounterError, CounterService};
pub use models::Aggregate;
pub use state::AppState;
pub use storage::{MemoryStore, RedisStore, ScoreStore};
pub use widget::{ClapWidget, CounterApi, WidgetOptions};
