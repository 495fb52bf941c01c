//! HTTP handlers.
pub mod count;
pub mod encode;
pub mod health;
pub mod metrics;
pub mod sayhi;

use percent_encoding::percent_decode;

use crate::ServerError;
use crate::error::Result;

/// Percent-decode one query component, `+` standing for a space.
/// `None` when an escape is not followed by two hex digits.
fn unescape(raw: &str) -> Option<Vec<u8>> {
    let bytes = raw.as_bytes();
    let well_formed = bytes
        .iter()
        .enumerate()
        .filter(|(_, byte)| **byte == b'%')
        .all(|(i, _)| {
            bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit))
        });

    well_formed.then(|| percent_decode(raw.replace('+', " ").as_bytes()).collect())
}

/// Raw bytes of the first well-formed `key` pair in the query string,
/// rejected when missing or empty. Malformed pairs are skipped.
pub(crate) fn required_param(query: Option<&str>, key: &'static str) -> Result<Vec<u8>> {
    query
        .and_then(|query| {
            query
                .split('&')
                .filter(|pair| !pair.is_empty())
                .filter_map(|pair| {
                    let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
                    Some((unescape(name)?, unescape(value)?))
                })
                .find(|(name, _)| name == key.as_bytes())
        })
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
        .ok_or(ServerError::MissingParam(key))
}

/// Same as [`required_param`], as text. Invalid UTF-8 is replaced.
pub(crate) fn required_text(query: Option<&str>, key: &'static str) -> Result<String> {
    required_param(query, key).map(|value| String::from_utf8_lossy(&value).into_owned())
}

/// MUST NEVER be used in production.
#[cfg(test)]
pub(crate) fn state(store: std::sync::Arc<dyn crate::database::CounterStore>) -> crate::AppState {
    crate::AppState {
        config: std::sync::Arc::new(crate::config::Configuration::default()),
        counter: crate::database::Counter::new(store),
        metrics: crate::telemetry::Metrics::new().expect("cannot build metrics registry"),
    }
}
