use crate::handlers;
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn router(state: AppState) -> Router {
    let counter_path = state.config.counter_path.clone();
    Router::new()
        .route("/", get(handlers::index))
        .route(
            &counter_path,
            get(handlers::read_claps)
                .patch(handlers::add_claps)
                .fallback(handlers::method_not_allowed),
        )
        .with_state(state)
}
