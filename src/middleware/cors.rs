//! Permissive CORS for Stremio clients (web and desktop).
//!
//! Every response gets the headers. `OPTIONS` is answered with `200` and an
//! empty body without reaching the router.

use axum::extract::Request;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

const ALLOW_ORIGIN: &str = "*";
const ALLOW_METHODS: &str = "GET,HEAD";
const ALLOW_HEADERS: &str = "Accept, Accept-Language, Content-Type, Origin, Accept-Encoding, Content-Language, X-Requested-With";

fn set_cors_headers(headers: &mut HeaderMap) {
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static(ALLOW_ORIGIN));
    headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOW_METHODS));
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOW_HEADERS));
}

pub async fn apply_cors(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        let mut response = StatusCode::OK.into_response();
        set_cors_headers(response.headers_mut());
        return response;
    }

    let mut response = next.run(request).await;
    set_cors_headers(response.headers_mut());
    response
}
