//! Client address resolution for rate limiting.
//!
//! Behind a reverse proxy every request arrives from the proxy's address, so
//! the immediate peer is a useless rate-limit key. The policy is explicit
//! configuration: use the peer, or trust one named header that the proxy
//! sets. Only enable the header policy when the proxy overwrites that header;
//! otherwise clients can pick their own key.

use std::net::SocketAddr;

use axum::http::HeaderMap;
use serde::Deserialize;

/// Key used when neither the header nor the peer address is available.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Where the client address used for rate limiting comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ClientAddressPolicy {
    /// The immediate TCP peer.
    #[default]
    Peer,
    /// The first entry of a trusted proxy header (e.g. `X-Forwarded-For`),
    /// falling back to the peer when the header is missing or empty.
    Header { name: String },
}

impl ClientAddressPolicy {
    /// Resolve the rate-limit key for one request.
    pub fn resolve(&self, peer: Option<SocketAddr>, headers: &HeaderMap) -> String {
        if let Self::Header { name } = self {
            let forwarded = headers
                .get(name.as_str())
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.split(',').next())
                .map(str::trim)
                .filter(|value| !value.is_empty());
            if let Some(address) = forwarded {
                return address.to_owned();
            }
        }

        peer.map_or_else(|| UNKNOWN_CLIENT.to_owned(), |addr| addr.ip().to_string())
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn peer() -> Option<SocketAddr> {
        Some("192.0.2.10:51234".parse().unwrap())
    }

    fn forwarded(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_str(value).unwrap());
        headers
    }

    fn header_policy() -> ClientAddressPolicy {
        ClientAddressPolicy::Header {
            name: "X-Forwarded-For".into(),
        }
    }

    #[test]
    fn peer_policy_ignores_headers() {
        let policy = ClientAddressPolicy::Peer;
        assert_eq!(policy.resolve(peer(), &forwarded("203.0.113.5")), "192.0.2.10");
    }

    #[test]
    fn header_policy_takes_first_hop() {
        let address = header_policy().resolve(peer(), &forwarded(" 203.0.113.5 , 10.0.0.1"));
        assert_eq!(address, "203.0.113.5");
    }

    #[test]
    fn header_policy_falls_back_to_peer() {
        assert_eq!(header_policy().resolve(peer(), &HeaderMap::new()), "192.0.2.10");
        assert_eq!(header_policy().resolve(peer(), &forwarded("  ")), "192.0.2.10");
    }

    #[test]
    fn missing_peer_is_unknown() {
        assert_eq!(
            ClientAddressPolicy::Peer.resolve(None, &HeaderMap::new()),
            UNKNOWN_CLIENT
        );
    }

    #[test]
    fn policy_deserializes_from_tagged_table() {
        let policy: ClientAddressPolicy =
            serde_json::from_str(r#"{"source":"header","name":"X-Real-IP"}"#).unwrap();
        assert_eq!(
            policy,
            ClientAddressPolicy::Header {
                name: "X-Real-IP".into()
            }
        );

        let policy: ClientAddressPolicy = serde_json::from_str(r#"{"source":"peer"}"#).unwrap();
        assert_eq!(policy, ClientAddressPolicy::Peer);
    }
}
