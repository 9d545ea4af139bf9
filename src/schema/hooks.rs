//! Custom validator hooks
//!
//! Checks that primitive refinements cannot express. Every hook receives a
//! value that already passed its field's kind check.

use std::net::{Ipv4Addr, Ipv6Addr};

use serde_json::Value;

/// Port appended to targets declared without one
pub const DEFAULT_TARGET_PORT: u16 = 8000;

/// Classification of a host string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostKind {
    Ipv4,
    Ipv6,
    Name,
}

/// Host and optional port split out of `host[:port]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPort {
    pub host: String,
    pub kind: HostKind,
    pub port: Option<u16>,
}

/// Parses `host`, `host:port`, `[v6]`, `[v6]:port` or a bare IPv6 address.
pub fn parse_host_port(input: &str) -> Option<HostPort> {
    if let Some(rest) = input.strip_prefix('[') {
        let (addr, tail) = rest.split_once(']')?;
        addr.parse::<Ipv6Addr>().ok()?;
        let port = match tail {
            "" => None,
            t => Some(parse_port(t.strip_prefix(':')?)?),
        };
        return Some(HostPort {
            host: format!("[{}]", addr),
            kind: HostKind::Ipv6,
            port,
        });
    }

    if input.matches(':').count() > 1 {
        input.parse::<Ipv6Addr>().ok()?;
        return Some(HostPort {
            host: format!("[{}]", input),
            kind: HostKind::Ipv6,
            port: None,
        });
    }

    let (host, port) = match input.split_once(':') {
        Some((h, p)) => (h, Some(parse_port(p)?)),
        None => (input, None),
    };

    let kind = if looks_like_ipv4(host) {
        host.parse::<Ipv4Addr>().ok()?;
        HostKind::Ipv4
    } else if is_valid_hostname(host) {
        HostKind::Name
    } else {
        return None;
    };

    Some(HostPort {
        host: host.to_string(),
        kind,
        port,
    })
}

fn parse_port(s: &str) -> Option<u16> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn looks_like_ipv4(host: &str) -> bool {
    !host.is_empty() && host.bytes().all(|b| b.is_ascii_digit() || b == b'.')
}

/// RFC 1123 hostname; underscores are tolerated inside labels.
pub fn is_valid_hostname(host: &str) -> bool {
    if host.is_empty() || host.len() > 253 {
        return false;
    }
    host.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    })
}

/// Upstream names: a hostname, no IP address, no port.
pub fn validate_upstream_name(value: &Value) -> Result<(), String> {
    let name = value.as_str().unwrap_or_default();
    match parse_host_port(name) {
        None => Err("Invalid name; must be a valid hostname".into()),
        Some(hp) if hp.kind != HostKind::Name => Err("Invalid name; no ip addresses allowed".into()),
        Some(hp) if hp.port.is_some() => Err("Invalid name; no port allowed".into()),
        Some(_) => Ok(()),
    }
}

/// Targets: `host[:port]` where host is a hostname or an IP address.
pub fn validate_target(value: &Value) -> Result<(), String> {
    let target = value.as_str().unwrap_or_default();
    match parse_host_port(target) {
        Some(_) => Ok(()),
        None => Err("Invalid target; not a valid hostname or ip address".into()),
    }
}

/// Canonical target form: always `host:port`, IPv6 hosts bracketed.
pub fn normalize_target(value: Value) -> Value {
    let parsed = value.as_str().and_then(parse_host_port);
    match parsed {
        Some(hp) => Value::String(format!(
            "{}:{}",
            hp.host,
            hp.port.unwrap_or(DEFAULT_TARGET_PORT)
        )),
        None => value,
    }
}

/// Server Name Indication: a hostname, not an IP, without a port.
pub fn validate_sni(value: &Value) -> Result<(), String> {
    let sni = value.as_str().unwrap_or_default();
    match parse_host_port(sni) {
        Some(hp) if hp.kind != HostKind::Name => Err("must not be an IP".into()),
        Some(hp) if hp.port.is_some() => Err("must not have a port".into()),
        Some(_) => Ok(()),
        None => Err("invalid value: ".to_string() + sni),
    }
}

/// HTTP header names: letters, digits, `-` and `_`.
pub fn validate_header_name(value: &Value) -> Result<(), String> {
    let name = value.as_str().unwrap_or_default();
    let ok = !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if ok {
        Ok(())
    } else {
        Err(format!(
            "bad header name '{}', allowed characters are A-Z, a-z, 0-9, '_', and '-'",
            name
        ))
    }
}

/// Cookie names: an RFC 6265 token (visible ASCII, no separators).
pub fn validate_cookie_name(value: &Value) -> Result<(), String> {
    const SEPARATORS: &[u8] = b"()<>@,;:\\\"/[]?={} \t";
    let name = value.as_str().unwrap_or_default();
    let ok = !name.is_empty()
        && name
            .bytes()
            .all(|b| (0x21..0x7f).contains(&b) && !SEPARATORS.contains(&b));
    if ok {
        Ok(())
    } else {
        Err(format!(
            "bad cookie name '{}', allowed characters are A-Z, a-z, 0-9 and !#$%&'*+-.^_`|~",
            name
        ))
    }
}
