//! Client IP and device fingerprint extraction.
//!
//! The device fingerprint is a coarse "OS - Browser" label parsed from the
//! User-Agent header. It feeds the refresh token anomaly check as a weak
//! signal only; it is not a security boundary.

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::{Extensions, HeaderMap, header};

/// Proxy headers consulted for the client IP, in priority order.
const IP_HEADERS: [&str; 5] = [
    "x-forwarded-for",
    "proxy-client-ip",
    "wl-proxy-client-ip",
    "http-client-ip",
    "http-x-forwarded-for",
];

/// Derive a coarse device descriptor from the User-Agent header.
///
/// Match order matters: Android user agents also contain "Linux", iPhone
/// agents contain "like Mac OS X", and Edge/Chrome agents contain "Safari".
pub fn extract_device_info(headers: &HeaderMap) -> String {
    let ua = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if ua.is_empty() {
        return "Unknown Device".to_string();
    }

    let os = if ua.contains("iPhone") || ua.contains("iPad") {
        "iOS"
    } else if ua.contains("Android") {
        "Android"
    } else if ua.contains("Mac OS X") {
        "macOS"
    } else if ua.contains("Windows") {
        "Windows"
    } else if ua.contains("Linux") {
        "Linux"
    } else {
        "Unknown OS"
    };

    let browser = if ua.contains("Edg") {
        "Edge"
    } else if ua.contains("Chrome") {
        "Chrome"
    } else if ua.contains("Firefox") {
        "Firefox"
    } else if ua.contains("Safari") {
        "Safari"
    } else if ua.contains("MSIE") || ua.contains("Trident") {
        "Internet Explorer"
    } else {
        "Unknown Browser"
    };

    format!("{} - {}", os, browser)
}

/// Best-effort client IP: walk the proxy header chain, skipping empty and
/// "unknown" values and taking the first entry of a comma-separated list,
/// then fall back to the socket peer address from ConnectInfo.
pub fn extract_client_ip(headers: &HeaderMap, extensions: &Extensions) -> Option<String> {
    for name in IP_HEADERS {
        if let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) {
            let candidate = value.split(',').next().unwrap_or("").trim();
            if !candidate.is_empty() && !candidate.eq_ignore_ascii_case("unknown") {
                return Some(candidate.to_string());
            }
        }
    }

    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
}
