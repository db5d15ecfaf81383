//! One structured log record per handled request.

use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::header::USER_AGENT;
use axum::middleware::Next;
use axum::response::Response;
use tracing::info;

use super::gate::ResourceRequest;
use super::ip::{forwarded_for, remote_ip};
use super::meta::MediaName;
use crate::registry::ResourceKind;

/// Optional fields of the request log.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLogging {
    pub log_ips: bool,
    pub log_user_agent: bool,
    /// Only for stream requests
    pub log_media_name: bool,
}

pub async fn log_request(
    State(fields): State<RequestLogging>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();

    let method = request.method().clone();
    let uri = request.uri().clone();
    let ip = fields.log_ips.then(|| remote_ip(&request).into_owned());
    let forwarded = if fields.log_ips {
        forwarded_for(request.headers())
    } else {
        None
    };
    let user_agent = fields.log_user_agent.then(|| {
        request
            .headers()
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    });
    let is_stream = fields.log_media_name
        && ResourceRequest::parse(&uri).is_some_and(|r| r.kind == ResourceKind::Stream);

    let response = next.run(request).await;

    let media_name = is_stream.then(|| {
        response
            .extensions()
            .get::<MediaName>()
            .map_or_else(|| MediaName::UNKNOWN.to_string(), ToString::to_string)
    });

    info!(
        status = response.status().as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        method = %method,
        url = %uri,
        ip = ip.as_deref(),
        forwarded_for = forwarded.as_deref(),
        user_agent = user_agent.as_deref(),
        media_name = media_name.as_deref(),
        "Handled request"
    );

    response
}
