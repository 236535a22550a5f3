//! Page keys and visitor identifiers.

use crate::counter::CounterError;
use axum::http::{header::REFERER, HeaderMap};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha256};
use url::Url;

pub const FORWARDED_FOR: &str = "x-forwarded-for";
pub const LOOPBACK_ADDRESS: &str = "127.0.0.1";

/// Resolves the page key for a request.
///
/// A non-empty explicit key wins. Otherwise the referring page's origin and
/// path are used, so query strings and fragments never split a page's claps.
pub fn page_key(
    prefix: &str,
    explicit: Option<&str>,
    referer: Option<&str>,
) -> Result<String, CounterError> {
    if let Some(key) = explicit.map(str::trim).filter(|key| !key.is_empty()) {
        return Ok(format!("{prefix}{key}"));
    }

    let referer = referer
        .map(str::trim)
        .filter(|referer| !referer.is_empty())
        .ok_or_else(|| CounterError::InvalidRequest("missing key or referer".to_string()))?;

    Ok(format!("{prefix}{}", normalize_page_url(referer)?))
}

pub fn normalize_page_url(raw: &str) -> Result<String, CounterError> {
    let url = Url::parse(raw)
        .map_err(|err| CounterError::InvalidRequest(format!("invalid referer: {err}")))?;
    let origin = url.origin();
    if !origin.is_tuple() {
        return Err(CounterError::InvalidRequest(format!(
            "referer has no origin: {raw}"
        )));
    }
    Ok(format!("{}{}", origin.ascii_serialization(), url.path()))
}

pub fn referer(headers: &HeaderMap) -> Option<&str> {
    headers.get(REFERER).and_then(|value| value.to_str().ok())
}

/// First hop of `X-Forwarded-For`, or the loopback placeholder.
pub fn client_address(headers: &HeaderMap) -> String {
    headers
        .get(FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .unwrap_or(LOOPBACK_ADDRESS)
        .to_string()
}

pub fn visitor_id(address: &str, hash: bool) -> String {
    if hash {
        hash_address(address)
    } else {
        address.to_string()
    }
}

/// SHA-256 of the address, base64 encoded. Raw addresses never reach the store.
pub fn hash_address(address: &str) -> String {
    let digest = Sha256::digest(address.as_bytes());
    STANDARD.encode(digest)
}
