//! Utility functions for request handling and logging

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::HeaderMap;
use sha2::{Digest, Sha256};

/// Client key used when neither a peer address nor a trusted forwarded
/// header is available (e.g. in-process router tests)
pub(crate) const UNKNOWN_CLIENT: &str = "unknown";

/// Derive the rate-limit key for a request
///
/// Uses the TCP peer IP. When `trust_forwarded_for` is set, the first entry of
/// `X-Forwarded-For` wins, which is only safe behind a proxy that overwrites
/// that header.
pub(crate) fn client_key(
    headers: &HeaderMap,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
    trust_forwarded_for: bool,
) -> String {
    if trust_forwarded_for {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|raw| raw.split(',').next())
            .map(str::trim)
            .filter(|s| !s.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }

    connect_info
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// First 16 hex chars of the SHA-256 of an API key (never log the actual key!)
pub(crate) fn key_fingerprint(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    let hash = hasher.finalize();
    format!("{:x}", hash)[..16].to_string()
}

/// Truncate text to at most `max_chars` characters for log output
pub(crate) fn truncate_for_log(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
