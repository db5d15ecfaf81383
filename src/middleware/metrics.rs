use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::metrics::{classify_endpoint, record_request};

/// Count every finished request by endpoint and final status.
pub async fn track_metrics(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let endpoint = classify_endpoint(request.uri().path());

    let response = next.run(request).await;

    record_request(
        endpoint,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );
    response
}
