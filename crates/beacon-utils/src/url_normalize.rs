//! Relay URL normalization and the private/local-network reject filter.
//!
//! Per spec: lowercase the host, strip a leading `www.`, drop a trailing
//! slash, and reject anything targeting `localhost` or an RFC1918 private
//! range.
//!
//! Open-question resolution (see `DESIGN.md`): the trailing slash is
//! stripped only if it is the *last character of the whole rebuilt string*,
//! after host normalization — not specially from the path alone. This means
//! `https://host/?a=1/` keeps the stripped slash even though it sits after
//! a query string, mirroring the ambiguous observed upstream behavior
//! rather than "fixing" it.

use url::Url;

/// Normalize a candidate relay URL, or return `None` if it is not a
/// `ws(s)://` URL or targets a disallowed host.
pub fn normalize_relay_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let parsed = Url::parse(trimmed).ok()?;

    if parsed.scheme() != "ws" && parsed.scheme() != "wss" {
        return None;
    }

    let host = parsed.host_str()?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();

    if is_private_or_local(&host) {
        return None;
    }

    let mut rebuilt = parsed.clone();
    rebuilt.set_host(Some(&host)).ok()?;

    let mut s = rebuilt.to_string();
    if s.ends_with('/') {
        s.pop();
    }
    Some(s)
}

/// Whether `host` names `localhost` or falls in an RFC1918/loopback range.
pub fn is_private_or_local(host: &str) -> bool {
    if host == "localhost" || host == "::1" {
        return true;
    }
    if let Ok(ip) = host.parse::<std::net::IpAddr>() {
        return match ip {
            std::net::IpAddr::V4(v4) => {
                v4.is_loopback() || v4.is_private() || v4.is_link_local() || v4.is_unspecified()
            }
            std::net::IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
        };
    }
    host.ends_with(".local")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_host_and_strips_www() {
        assert_eq!(
            normalize_relay_url("wss://Relay.Example/"),
            Some("wss://relay.example".to_string())
        );
        assert_eq!(
            normalize_relay_url("wss://WWW.Relay.Example"),
            Some("wss://relay.example".to_string())
        );
    }

    #[test]
    fn strips_exactly_one_trailing_slash() {
        assert_eq!(
            normalize_relay_url("wss://relay.example/"),
            Some("wss://relay.example".to_string())
        );
        assert_eq!(
            normalize_relay_url("wss://relay.example//"),
            Some("wss://relay.example/".to_string())
        );
    }

    #[test]
    fn rejects_non_ws_schemes() {
        assert_eq!(normalize_relay_url("https://relay.example"), None);
        assert_eq!(normalize_relay_url("not a url"), None);
    }

    #[test]
    fn rejects_localhost_and_private_ranges() {
        assert_eq!(normalize_relay_url("ws://localhost:4848"), None);
        assert_eq!(normalize_relay_url("ws://127.0.0.1:4848"), None);
        assert_eq!(normalize_relay_url("ws://10.0.0.5:4848"), None);
        assert_eq!(normalize_relay_url("ws://192.168.1.1:4848"), None);
        assert_eq!(normalize_relay_url("ws://172.16.0.1:4848"), None);
    }

    #[test]
    fn accepts_public_relay() {
        assert_eq!(
            normalize_relay_url("wss://relay.damus.io"),
            Some("wss://relay.damus.io".to_string())
        );
    }

    #[test]
    fn idempotent_normalization() {
        let once = normalize_relay_url("wss://Relay.Example/").unwrap();
        let twice = normalize_relay_url(&once).unwrap();
        assert_eq!(once, twice);
    }
}
