//! Greet someone and count how many times they were greeted.

use axum::extract::{RawQuery, State};

use crate::database::Counter;
use crate::error::Result;

pub async fn handler(State(counter): State<Counter>, RawQuery(query): RawQuery) -> Result<String> {
    let name = super::required_text(query.as_deref(), "name")?;
    counter.increment_or_init(&name).await?;

    Ok(format!("Hello {name}!"))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::{Method, StatusCode};
    use http_body_util::BodyExt;

    use crate::database::mem::MemoryStore;
    use crate::database::{CounterStore, UnreachableStore};
    use crate::telemetry::{REQUEST_COUNT, REQUEST_LATENCY, sample};
    use crate::*;

    #[tokio::test]
    async fn test_sayhi_counts_greetings() {
        let store = Arc::new(MemoryStore::default());
        let app = app(router::state(store.clone()));

        for expected in ["1", "2", "3"] {
            let response = make_request(app.clone(), Method::GET, "/sayhi?name=alice").await;
            assert_eq!(response.status(), StatusCode::OK);

            let body = response.into_body().collect().await.unwrap().to_bytes();
            assert_eq!(&body[..], b"Hello alice!");
            assert_eq!(store.get("alice").await.unwrap().as_deref(), Some(expected));
        }
    }

    #[tokio::test]
    async fn test_sayhi_missing_name() {
        let state = router::state(Arc::new(MemoryStore::default()));
        let app = app(state.clone());

        for path in ["/sayhi", "/sayhi?name="] {
            let response = make_request(app.clone(), Method::GET, path).await;
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

            let body = response.into_body().collect().await.unwrap().to_bytes();
            assert_eq!(&body[..], b"Url Param 'name' is missing");
        }

        let rendered = state.metrics.render();
        let labels = [("code", "500"), ("path", "/sayhi")];
        assert_eq!(sample(&rendered, REQUEST_COUNT, &labels), Some(2.0));
        assert_eq!(
            sample(&rendered, &format!("{REQUEST_LATENCY}_count"), &labels),
            Some(2.0)
        );
        assert!(sample(&rendered, REQUEST_COUNT, &[("code", "200")]).is_none());
    }

    #[tokio::test]
    async fn test_sayhi_store_error() {
        let state = router::state(Arc::new(UnreachableStore));
        let app = app(state.clone());

        let response = make_request(app, Method::GET, "/sayhi?name=alice").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"Redis Error");

        let rendered = state.metrics.render();
        let labels = [("code", "500"), ("path", "/sayhi")];
        assert_eq!(sample(&rendered, REQUEST_COUNT, &labels), Some(1.0));
        assert_eq!(
            sample(&rendered, &format!("{REQUEST_LATENCY}_count"), &labels),
            Some(1.0)
        );
    }

    #[tokio::test]
    async fn test_sayhi_non_integer_value() {
        let store = Arc::new(MemoryStore::default());
        store.set("alice", "many".into()).await.unwrap();
        let app = app(router::state(store));

        let response = make_request(app, Method::GET, "/sayhi?name=alice").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"Redis Error");
    }

    #[tokio::test]
    async fn test_sayhi_accepts_any_method() {
        let app = app(router::state(Arc::new(MemoryStore::default())));

        let response = make_request(app, Method::POST, "/sayhi?name=bob").await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
