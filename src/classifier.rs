/*============================================================
  Synavera Project: Syn-Net
  Module: synnet_core::classifier
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Map any failure to exactly one issue type, sanitize
    failure messages and extract the target host.

  Security / Safety Notes:
    Credential query parameters are masked before a message
    can reach persisted logs.

  Dependencies:
    regex for redaction, url for host parsing, serde for the
    persisted issue type names.

  Operational Scope:
    Pure functions called by the event builder.

  Revision History:
    2026-10-19 COD  Authored classification decision table.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Total, ordered, first-match-wins classification
    - Exhaustive matching over the issue taxonomy
============================================================*/

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::{Host, Url};

use crate::failure::{Failure, FailureKind};

/// Maximum sanitized message length in characters.
pub const MAX_MESSAGE_CHARS: usize = 800;
pub const TRUNCATION_MARKER: &str = "…(truncated)";
pub const REDACTION_MASK: &str = "***";

/// Phrases that mark an explicit "device is offline" condition.
pub const OFFLINE_PHRASES: &[&str] = &[
    "no network",
    "network unavailable",
    "network is not connected",
    "internet connection appears to be offline",
    "网络未连接",
];

/// Trace marker emitted when a resolver found only IPv6 answers.
pub const NO_IPV4_MARKER: &str = "no ipv4";

static CREDENTIAL_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(consumer_key=|consumer_secret=)[^&\s]+").expect("credential pattern is valid")
});

/// Closed classification of network failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueType {
    NoNetwork,
    Dns,
    IpVersionMismatch,
    Timeout,
    Connection,
    Tls,
    HttpAuth,
    HttpRateLimit,
    HttpClientError,
    HttpServerError,
    HttpOther,
    Io,
    Unknown,
}

impl IssueType {
    pub const ALL: [IssueType; 13] = [
        IssueType::NoNetwork,
        IssueType::Dns,
        IssueType::IpVersionMismatch,
        IssueType::Timeout,
        IssueType::Connection,
        IssueType::Tls,
        IssueType::HttpAuth,
        IssueType::HttpRateLimit,
        IssueType::HttpClientError,
        IssueType::HttpServerError,
        IssueType::HttpOther,
        IssueType::Io,
        IssueType::Unknown,
    ];

    /// Name used in fingerprints, reports and the persisted layout.
    pub fn name(self) -> &'static str {
        match self {
            IssueType::NoNetwork => "NO_NETWORK",
            IssueType::Dns => "DNS",
            IssueType::IpVersionMismatch => "IP_VERSION_MISMATCH",
            IssueType::Timeout => "TIMEOUT",
            IssueType::Connection => "CONNECTION",
            IssueType::Tls => "TLS",
            IssueType::HttpAuth => "HTTP_AUTH",
            IssueType::HttpRateLimit => "HTTP_RATE_LIMIT",
            IssueType::HttpClientError => "HTTP_CLIENT_ERROR",
            IssueType::HttpServerError => "HTTP_SERVER_ERROR",
            IssueType::HttpOther => "HTTP_OTHER",
            IssueType::Io => "IO",
            IssueType::Unknown => "UNKNOWN",
        }
    }
}

/// Classify a failure. First match wins; every input yields an issue type.
pub fn classify(
    failure: &Failure,
    http_status: Option<u16>,
    diagnostic_trace: Option<&str>,
    message: Option<&str>,
) -> IssueType {
    if let Some(code) = http_status {
        return classify_status(code);
    }

    if message.map(is_offline_message).unwrap_or(false) {
        return IssueType::NoNetwork;
    }

    let root = failure.root_cause();
    if *root.kind() == FailureKind::UnresolvedHost {
        return IssueType::Dns;
    }

    if diagnostic_trace
        .map(|trace| trace.to_lowercase().contains(NO_IPV4_MARKER))
        .unwrap_or(false)
    {
        return IssueType::IpVersionMismatch;
    }

    match root.kind() {
        FailureKind::SocketTimeout => IssueType::Timeout,
        FailureKind::TlsHandshake | FailureKind::TlsPeerUnverified | FailureKind::Tls => {
            IssueType::Tls
        }
        FailureKind::ConnectRefused | FailureKind::NoRouteToHost | FailureKind::Socket => {
            IssueType::Connection
        }
        FailureKind::EndOfStream | FailureKind::Io => IssueType::Io,
        FailureKind::UnresolvedHost => IssueType::Dns,
        FailureKind::HttpStatus(_) | FailureKind::Cancelled | FailureKind::Other(_) => {
            IssueType::Unknown
        }
    }
}

fn classify_status(code: u16) -> IssueType {
    match code {
        401 | 403 => IssueType::HttpAuth,
        429 => IssueType::HttpRateLimit,
        400..=499 => IssueType::HttpClientError,
        500..=599 => IssueType::HttpServerError,
        _ => IssueType::HttpOther,
    }
}

fn is_offline_message(message: &str) -> bool {
    let lowered = message.to_lowercase();
    OFFLINE_PHRASES.iter().any(|phrase| lowered.contains(phrase))
}

/// Mask credential parameters and cap length. Blank input is returned as is.
pub fn sanitize_message(raw: Option<&str>) -> Option<String> {
    let raw = raw?;
    if raw.trim().is_empty() {
        return Some(raw.to_string());
    }

    let redacted = CREDENTIAL_PARAM.replace_all(raw, format!("${{1}}{REDACTION_MASK}").as_str());
    if redacted.chars().count() > MAX_MESSAGE_CHARS {
        let mut truncated: String = redacted.chars().take(MAX_MESSAGE_CHARS).collect();
        truncated.push_str(TRUNCATION_MARKER);
        Some(truncated)
    } else {
        Some(redacted.into_owned())
    }
}

/// Host component of an http(s) URL; `None` for blank or unparsable input.
pub fn extract_host(site_url: Option<&str>) -> Option<String> {
    let raw = site_url?.trim();
    if raw.is_empty() {
        return None;
    }
    let url = Url::parse(raw).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    match url.host()? {
        Host::Domain(domain) => Some(domain.to_string()),
        Host::Ipv4(addr) => Some(addr.to_string()),
        Host::Ipv6(addr) => Some(addr.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn failure(kind: FailureKind, message: &str) -> Failure {
        Failure::with_message(kind, message)
    }

    #[test]
    fn http_status_wins_over_everything() {
        let f = Failure::http_status(429, "no network dns error");
        assert_eq!(classify(&f, Some(429), Some("no IPv4"), Some("no network")), IssueType::HttpRateLimit);
    }

    #[test]
    fn status_table() {
        let cases = [
            (401, IssueType::HttpAuth),
            (403, IssueType::HttpAuth),
            (429, IssueType::HttpRateLimit),
            (404, IssueType::HttpClientError),
            (400, IssueType::HttpClientError),
            (500, IssueType::HttpServerError),
            (503, IssueType::HttpServerError),
            (302, IssueType::HttpOther),
            (600, IssueType::HttpOther),
        ];
        for (code, expected) in cases {
            let f = Failure::http_status(code, "status");
            assert_eq!(classify(&f, Some(code), None, None), expected, "{code}");
        }
    }

    #[test]
    fn offline_message_precedes_root_cause() {
        let f = failure(FailureKind::UnresolvedHost, "No Network available");
        assert_eq!(classify(&f, None, None, Some("No Network available")), IssueType::NoNetwork);
    }

    #[test]
    fn root_cause_decides_transport_kinds() {
        let cases = [
            (FailureKind::UnresolvedHost, IssueType::Dns),
            (FailureKind::SocketTimeout, IssueType::Timeout),
            (FailureKind::TlsHandshake, IssueType::Tls),
            (FailureKind::TlsPeerUnverified, IssueType::Tls),
            (FailureKind::ConnectRefused, IssueType::Connection),
            (FailureKind::NoRouteToHost, IssueType::Connection),
            (FailureKind::Socket, IssueType::Connection),
            (FailureKind::EndOfStream, IssueType::Io),
            (FailureKind::Io, IssueType::Io),
            (FailureKind::Other("Weird".into()), IssueType::Unknown),
            (FailureKind::Cancelled, IssueType::Unknown),
        ];
        for (kind, expected) in cases {
            let f = failure(FailureKind::Other("Wrapper".into()), "outer")
                .caused_by(failure(kind.clone(), "inner"));
            assert_eq!(classify(&f, None, None, Some("inner")), expected, "{kind:?}");
        }
    }

    #[test]
    fn missing_ipv4_trace_beats_timeout_but_not_dns() {
        let timeout = failure(FailureKind::SocketTimeout, "connect timed out");
        assert_eq!(
            classify(&timeout, None, Some("A: none, no IPv4 result found"), None),
            IssueType::IpVersionMismatch
        );

        let dns = failure(FailureKind::UnresolvedHost, "host");
        assert_eq!(classify(&dns, None, Some("no IPv4 result found"), None), IssueType::Dns);
    }

    #[test]
    fn classification_is_total_on_cycles_and_empty_messages() {
        let a = Arc::new(Failure::new(FailureKind::Io, None));
        let b = Arc::new(Failure::new(FailureKind::Other("X".into()), None));
        a.init_cause(b.clone());
        b.init_cause(a.clone());
        assert_eq!(classify(&a, None, None, None), IssueType::Unknown);
        assert_eq!(classify(&b, None, None, Some("")), IssueType::Io);
    }

    #[test]
    fn redacts_credentials() {
        let raw = "GET /wp-json/wc/v3/orders?consumer_key=abc123&consumer_secret=xyz789 failed";
        let sanitized = sanitize_message(Some(raw)).unwrap();
        assert_eq!(
            sanitized,
            "GET /wp-json/wc/v3/orders?consumer_key=***&consumer_secret=*** failed"
        );
        assert!(!sanitized.contains("abc123"));
        assert!(!sanitized.contains("xyz789"));
    }

    #[test]
    fn truncates_long_messages() {
        let raw = "é".repeat(MAX_MESSAGE_CHARS + 50);
        let sanitized = sanitize_message(Some(&raw)).unwrap();
        assert!(sanitized.ends_with(TRUNCATION_MARKER));
        assert_eq!(
            sanitized.chars().count(),
            MAX_MESSAGE_CHARS + TRUNCATION_MARKER.chars().count()
        );
    }

    #[test]
    fn blank_and_missing_messages_pass_through() {
        assert_eq!(sanitize_message(None), None);
        assert_eq!(sanitize_message(Some("  ")), Some("  ".to_string()));
    }

    #[test]
    fn host_extraction() {
        assert_eq!(extract_host(Some("https://shop.example.com")), Some("shop.example.com".into()));
        assert_eq!(
            extract_host(Some("  https://Shop.Example.com:8443/wp-json?x=1 ")),
            Some("shop.example.com".into())
        );
        assert_eq!(extract_host(Some("http://[::1]:8080/")), Some("::1".into()));
        assert_eq!(extract_host(Some("shop.example.com")), None);
        assert_eq!(extract_host(Some("ftp://shop.example.com")), None);
        assert_eq!(extract_host(Some("   ")), None);
        assert_eq!(extract_host(Some("https://")), None);
        assert_eq!(extract_host(None), None);
    }

    #[test]
    fn names_are_unique() {
        let mut names: Vec<&str> = IssueType::ALL.iter().map(|t| t.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), IssueType::ALL.len());
        assert_eq!(serde_json::to_string(&IssueType::HttpRateLimit).unwrap(), "\"HTTP_RATE_LIMIT\"");
    }
}
