//! Read a greeting counter.

use axum::extract::{RawQuery, State};

use crate::database::Counter;
use crate::error::Result;

pub async fn handler(State(counter): State<Counter>, RawQuery(query): RawQuery) -> Result<String> {
    let name = super::required_text(query.as_deref(), "name")?;

    Ok(match counter.read(&name).await? {
        Some(count) => format!("{name}: {count}"),
        None => format!("{name}: not found"),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::{Method, StatusCode};
    use http_body_util::BodyExt;

    use crate::database::UnreachableStore;
    use crate::database::mem::MemoryStore;
    use crate::telemetry::{REQUEST_COUNT, REQUEST_LATENCY, sample};
    use crate::*;

    #[tokio::test]
    async fn test_count_before_and_after_greeting() {
        let app = app(router::state(Arc::new(MemoryStore::default())));

        let response = make_request(app.clone(), Method::GET, "/count?name=X").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"X: not found");

        let response = make_request(app.clone(), Method::GET, "/sayhi?name=X").await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = make_request(app, Method::GET, "/count?name=X").await;
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"X: 1");
    }

    #[tokio::test]
    async fn test_count_missing_name_records_latency() {
        let state = router::state(Arc::new(MemoryStore::default()));
        let app = app(state.clone());

        let response = make_request(app, Method::GET, "/count?other=X").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"Url Param 'name' is missing");

        let rendered = state.metrics.render();
        let labels = [("code", "500"), ("path", "/count")];
        assert_eq!(sample(&rendered, REQUEST_COUNT, &labels), Some(1.0));
        assert_eq!(
            sample(&rendered, &format!("{REQUEST_LATENCY}_count"), &labels),
            Some(1.0)
        );
    }

    #[tokio::test]
    async fn test_count_store_error() {
        let state = router::state(Arc::new(UnreachableStore));
        let app = app(state.clone());

        let response = make_request(app, Method::GET, "/count?name=X").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"Redis Error");

        let rendered = state.metrics.render();
        let labels = [("code", "500"), ("path", "/count")];
        assert_eq!(sample(&rendered, REQUEST_COUNT, &labels), Some(1.0));
        assert_eq!(
            sample(&rendered, &format!("{REQUEST_LATENCY}_count"), &labels),
            Some(1.0)
        );
    }
}
