//! Client IP extraction from HTTP headers
//!
//! Precedence follows what a reverse proxy in front of the service reports:
//! - First hop of X-Forwarded-For
//! - Falls back to the socket remote address
//!
//! The result is normalized so that loopback and IPv4-mapped IPv6 forms
//! collapse to plain IPv4.

use axum::http::HeaderMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Extract the client IP address for a request
///
/// # Arguments
/// * `headers` - HTTP request headers
/// * `socket_addr` - The connection remote address (fallback)
pub fn extract_client_ip(headers: &HeaderMap, socket_addr: IpAddr) -> IpAddr {
    let ip = extract_forwarded_first_hop(headers).unwrap_or(socket_addr);
    normalize_ip(ip)
}

/// First parseable address in X-Forwarded-For (the original client)
fn extract_forwarded_first_hop(headers: &HeaderMap) -> Option<IpAddr> {
    let xff = headers.get("x-forwarded-for")?.to_str().ok()?;

    xff.split(',')
        .map(str::trim)
        .find_map(parse_hop)
}

/// A hop is a bare address or an address with a port (`[v6]:port` for IPv6)
fn parse_hop(hop: &str) -> Option<IpAddr> {
    hop.parse::<IpAddr>()
        .ok()
        .or_else(|| hop.parse::<SocketAddr>().ok().map(|addr| addr.ip()))
}

/// Collapse IPv6 loopback and IPv4-mapped IPv6 addresses to IPv4
///
/// - `::1` becomes `127.0.0.1`
/// - `::ffff:a.b.c.d` becomes `a.b.c.d`
pub fn normalize_ip(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(addr) if addr.is_loopback() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(addr) => match addr.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => IpAddr::V6(addr),
        },
        v4 => v4,
    }
}
