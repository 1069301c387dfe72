use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ezviewer_core::reader::ReadError;
use ezviewer_core::RegistryError;
use tokio::task::JoinError;

/// Error returned by the JSON API.
///
/// Renders as `{"error": "<message>", "lines": []}` so history clients can
/// treat every response as carrying a (possibly empty) `lines` array.
#[derive(Debug)]
pub struct ApiErr {
    status: StatusCode,
    message: String,
}

impl ApiErr {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    /// Log `err` and answer 500. Paths in the message are the user's own
    /// files, so the detail is passed through.
    pub fn internal(context: &str, err: impl fmt::Display) -> Self {
        tracing::error!("{context}: {err}");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, format!("{context}: {err}"))
    }
}

impl From<RegistryError> for ApiErr {
    fn from(err: RegistryError) -> Self {
        Self::internal("registry", err)
    }
}

impl From<ReadError> for ApiErr {
    fn from(err: ReadError) -> Self {
        Self::internal("read", err)
    }
}

impl From<JoinError> for ApiErr {
    fn from(err: JoinError) -> Self {
        Self::internal("blocking task", err)
    }
}

impl IntoResponse for ApiErr {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message, "lines": [] });
        (self.status, Json(body)).into_response()
    }
}
