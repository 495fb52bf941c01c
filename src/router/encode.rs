//! Base64 encoding endpoint.

use axum::extract::RawQuery;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::Result;

pub async fn handler(RawQuery(query): RawQuery) -> Result<String> {
    let data = super::required_param(query.as_deref(), "data")?;
    Ok(STANDARD.encode(data))
}
