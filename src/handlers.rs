use crate::counter::coerce_delta;
use crate::errors::AppError;
use crate::identity::{client_address, page_key, referer, visitor_id};
use crate::models::{Aggregate, IncrementRequest, KeyQuery};
use crate::state::AppState;
use crate::ui::render_index;
use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    http::HeaderMap,
    response::Html,
    Json,
};

pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(render_index(&state.config))
}

pub async fn read_claps(
    State(state): State<AppState>,
    query: Result<Query<KeyQuery>, QueryRejection>,
    headers: HeaderMap,
) -> Result<Json<Aggregate>, AppError> {
    let query = key_query(query)?;
    let (key, visitor) = resolve(&state, query.key.as_deref(), &headers)?;
    let aggregate = state.counter.read(&key, &visitor).await?;
    Ok(Json(aggregate))
}

pub async fn add_claps(
    State(state): State<AppState>,
    query: Result<Query<KeyQuery>, QueryRejection>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Aggregate>, AppError> {
    let query = key_query(query)?;
    let payload = parse_increment(&body)?;
    let explicit = payload.key.as_deref().or(query.key.as_deref());
    let (key, visitor) = resolve(&state, explicit, &headers)?;

    let delta = coerce_delta(payload.score.as_ref());
    let aggregate = state.counter.increment(&key, &visitor, delta).await?;
    Ok(Json(aggregate))
}

pub async fn method_not_allowed() -> AppError {
    AppError::method_not_allowed()
}

fn key_query(query: Result<Query<KeyQuery>, QueryRejection>) -> Result<KeyQuery, AppError> {
    query
        .map(|Query(query)| query)
        .map_err(|rejection| AppError::bad_request(rejection.body_text()))
}

fn resolve(
    state: &AppState,
    explicit: Option<&str>,
    headers: &HeaderMap,
) -> Result<(String, String), AppError> {
    let key = page_key(&state.config.key_prefix, explicit, referer(headers))?;
    let visitor = visitor_id(&client_address(headers), state.config.hash_visitors);
    Ok((key, visitor))
}

// An absent body is a zero-delta request; a present one has to be JSON.
fn parse_increment(body: &[u8]) -> Result<IncrementRequest, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(IncrementRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|err| AppError::bad_request(format!("invalid body: {err}")))
}
