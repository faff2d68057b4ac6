//! IP address / CIDR validation for `remote_addr`-style fields

use std::net::IpAddr;

/// Check for a dotted IPv4 or colon IPv6 literal with an optional
/// `/prefix` (0-32 for IPv4, 0-128 for IPv6).
#[must_use]
pub fn is_ip_or_cidr(value: &str) -> bool {
    let (addr, prefix) = match value.split_once('/') {
        Some((addr, prefix)) => (addr, Some(prefix)),
        None => (value, None),
    };

    let Ok(ip) = addr.parse::<IpAddr>() else {
        return false;
    };

    let Some(prefix) = prefix else {
        return true;
    };

    // u8::from_str accepts a leading '+'; the Admin API does not
    if prefix.is_empty() || prefix.len() > 3 || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let Ok(bits) = prefix.parse::<u8>() else {
        return false;
    };

    match ip {
        IpAddr::V4(_) => bits <= 32,
        IpAddr::V6(_) => bits <= 128,
    }
}
