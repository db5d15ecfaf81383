//! Client address extraction for request logging.
//!
//! The peer address comes from Axum's `ConnectInfo` when the server was
//! started with connection info (always the case for [`Addon::serve`]).
//! Without it, `X-Forwarded-For` and `X-Real-IP` are used.
//!
//! **These headers are client-provided.** Behind a reverse proxy they carry
//! the real client address; without one they can be spoofed freely, so only
//! use them for logging.
//!
//! [`Addon::serve`]: crate::addon::Addon::serve

use std::borrow::Cow;
use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request};

/// Fallback when no client address can be determined.
pub const UNKNOWN_IP: &str = "unknown";

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";

/// Where a header-derived address came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExtractedIp<'a> {
    /// First entry of `X-Forwarded-For`
    FromXff(&'a str),
    FromRealIp(&'a str),
    NotFound,
}

#[inline]
fn extract_ip_from_headers(headers: &HeaderMap) -> ExtractedIp<'_> {
    // Format: "client, proxy1, proxy2"
    if let Some(forwarded) = headers.get(X_FORWARDED_FOR)
        && let Ok(value) = forwarded.to_str()
        && let Some(first_ip) = value.split(',').next()
    {
        return ExtractedIp::FromXff(first_ip.trim());
    }

    if let Some(real_ip) = headers.get(X_REAL_IP)
        && let Ok(value) = real_ip.to_str()
    {
        return ExtractedIp::FromRealIp(value.trim());
    }

    ExtractedIp::NotFound
}

/// Address of the connected peer, falling back to proxy headers.
#[inline]
pub fn remote_ip<B>(req: &Request<B>) -> Cow<'static, str> {
    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return Cow::Owned(addr.ip().to_string());
    }

    match extract_ip_from_headers(req.headers()) {
        ExtractedIp::FromXff(ip) | ExtractedIp::FromRealIp(ip) => Cow::Owned(ip.to_string()),
        ExtractedIp::NotFound => Cow::Borrowed(UNKNOWN_IP),
    }
}

/// All `X-Forwarded-For` values, joined with ", ".
pub fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    let values: Vec<&str> = headers
        .get_all(X_FORWARDED_FOR)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();

    if values.is_empty() {
        None
    } else {
        Some(values.join(", "))
    }
}
