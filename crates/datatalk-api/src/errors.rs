//! Maps the shared [`CoreError`] taxonomy onto HTTP status codes. A
//! handler only needs `?` against a `CoreError`-producing call; this is
//! the single place status codes are decided.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use datatalk_core::{CoreError, ErrorKind};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

pub struct ApiError(pub CoreError);

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError(err)
    }
}

fn status_for(kind: &ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::ProtocolViolation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::DatasetNotFound => StatusCode::NOT_FOUND,
        ErrorKind::FileUnreadable => StatusCode::BAD_REQUEST,
        ErrorKind::ValidationFailed => StatusCode::BAD_REQUEST,
        ErrorKind::AiUnavailable | ErrorKind::AiInvalidResponse => StatusCode::OK,
        ErrorKind::QueryTimeout => StatusCode::REQUEST_TIMEOUT,
        ErrorKind::EngineError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0.kind);
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(kind = self.0.kind.as_str(), message = %self.0.message, "unhandled engine error");
        }
        (
            status,
            Json(ErrorBody {
                error: self.0.kind.as_str(),
                message: self.0.message,
            }),
        )
            .into_response()
    }
}
