//! Error handler for prometheus-demo.

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::database::StoreError;

/// Body sent back whenever the key-value store fails, whatever the cause.
pub const STORE_ERROR_BODY: &str = "Redis Error";

pub type Result<T> = std::result::Result<T, ServerError>;

/// Enum representing server-side errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Url Param '{0}' is missing")]
    MissingParam(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let body = match &self {
            ServerError::MissingParam(param) => {
                tracing::warn!(%param, "required query parameter is missing");
                self.to_string()
            },
            ServerError::Store(err) => {
                tracing::error!(kind = err.kind(), error = %err, "key-value store request failed");
                STORE_ERROR_BODY.to_owned()
            },
        };

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            body,
        )
            .into_response()
    }
}
