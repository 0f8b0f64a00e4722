//! Client identification utilities
//!
//! Common functions for identifying clients and their credentials via HTTP
//! headers.

use axum::http::{HeaderMap, header};
use std::net::IpAddr;

const BEARER_PREFIX: &str = "Bearer ";

/// Extract a bearer token from the `Authorization` header
///
/// Returns `None` when the header is missing, not valid UTF-8, uses another
/// scheme, or carries an empty token.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Extract client IP address from headers
///
/// `X-Forwarded-For` is only honoured when the direct peer is one of
/// `trusted_proxies`. The chain is then walked right to left and the first
/// hop that is not itself a trusted proxy wins.
///
/// ## Arguments
/// * `headers` - HTTP request headers
/// * `direct_ip` - Direct connection IP address
/// * `trusted_proxies` - Reverse proxies allowed to set `X-Forwarded-For`
///
/// ## Returns
/// The client IP address, or None if not determinable
pub fn extract_client_ip(
    headers: &HeaderMap,
    direct_ip: Option<IpAddr>,
    trusted_proxies: &[IpAddr],
) -> Option<IpAddr> {
    let peer = direct_ip?;
    if !trusted_proxies.contains(&peer) {
        return Some(peer);
    }

    let Some(xff) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) else {
        return Some(peer);
    };

    let mut client = peer;
    for hop in xff.rsplit(',') {
        match hop.trim().parse::<IpAddr>() {
            Ok(ip) if trusted_proxies.contains(&ip) => client = ip,
            Ok(ip) => return Some(ip),
            // A malformed hop ends the part of the chain we can vouch for
            Err(_) => break,
        }
    }
    Some(client)
}
