//! Correlation-id middleware: mints a per-request id, opens a `tracing`
//! span carrying it for the whole request, and echoes it back on the
//! response so client-side logs can be joined against server logs.

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use tracing::Instrument;
use uuid::Uuid;

const HEADER_NAME: &str = "x-correlation-id";

pub async fn correlation_id(request: Request, next: Next) -> Response {
    let correlation_id = Uuid::new_v4().to_string();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let span = tracing::info_span!(
        "request",
        correlation_id = %correlation_id,
        %method,
        %path,
    );

    async move {
        let mut response = next.run(request).await;
        if let Ok(value) = HeaderValue::from_str(&correlation_id) {
            response.headers_mut().insert(HEADER_NAME, value);
        }
        response
    }
    .instrument(span)
    .await
}
