/*============================================================
  Synavera Project: Syn-Net
  Module: synnet_core::presentation
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Derive grouping fingerprints and render titles, summaries,
    remediation hints and the detailed diagnosis report.

  Security / Safety Notes:
    Receives sanitized messages only.

  Dependencies:
    std only.

  Operational Scope:
    Pure functions called by the event builder and exporters.

  Revision History:
    2026-10-19 COD  Authored fingerprint and report builders.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Static per-issue tables, exhaustively matched
    - Deterministic report layout
============================================================*/

use std::fmt::Write as _;

use crate::classifier::IssueType;

pub const FINGERPRINT_DELIMITER: &str = "|";
pub const UNKNOWN_HOST: &str = "unknown-host";
pub const SENTINEL: &str = "-";

/// Trace marker written when the secure (DoH/DoT) resolver failed.
pub const SECURE_RESOLVER_FAILED_MARKER: &str = "[secure-resolver] failed";
/// Trace marker written when resolution fell back to the system resolver.
pub const RESOLVER_FALLBACK_MARKER: &str = "[resolver-fallback]";

/// Grouping key for "the same underlying problem".
pub fn fingerprint(
    issue_type: IssueType,
    host: Option<&str>,
    http_status: Option<u16>,
    root_cause_kind: &str,
    extra_key: Option<&str>,
) -> String {
    let status = http_status.map(|code| code.to_string());
    [
        issue_type.name(),
        host.unwrap_or(UNKNOWN_HOST),
        status.as_deref().unwrap_or(SENTINEL),
        root_cause_kind,
        extra_key.unwrap_or(SENTINEL),
    ]
    .join(FINGERPRINT_DELIMITER)
}

/// Sub-signature separating materially different causes within one issue type.
pub fn fingerprint_extra_key(
    issue_type: IssueType,
    diagnostic_trace: Option<&str>,
    message: Option<&str>,
) -> Option<&'static str> {
    let trace_has = |needle: &str| diagnostic_trace.map(|t| t.contains(needle)).unwrap_or(false);
    let message_has = |needle: &str| {
        message
            .map(|m| m.to_lowercase().contains(needle))
            .unwrap_or(false)
    };

    match issue_type {
        IssueType::Dns | IssueType::IpVersionMismatch => {
            if trace_has(SECURE_RESOLVER_FAILED_MARKER) {
                Some("secure_resolver_fail")
            } else if trace_has(RESOLVER_FALLBACK_MARKER) {
                Some("resolver_fallback")
            } else {
                None
            }
        }
        IssueType::Tls => {
            if message_has("handshake") {
                Some("handshake")
            } else if message_has("certificate") {
                Some("cert")
            } else {
                None
            }
        }
        IssueType::Timeout => {
            if message_has("connect") {
                Some("connect_timeout")
            } else if message_has("read") {
                Some("read_timeout")
            } else {
                None
            }
        }
        IssueType::NoNetwork
        | IssueType::Connection
        | IssueType::HttpAuth
        | IssueType::HttpRateLimit
        | IssueType::HttpClientError
        | IssueType::HttpServerError
        | IssueType::HttpOther
        | IssueType::Io
        | IssueType::Unknown => None,
    }
}

pub fn build_title(issue_type: IssueType, http_status: Option<u16>) -> String {
    let code = |fallback: &str| {
        http_status
            .map(|c| c.to_string())
            .unwrap_or_else(|| fallback.to_string())
    };
    match issue_type {
        IssueType::NoNetwork => "No network connection".to_string(),
        IssueType::Dns => "DNS resolution failed".to_string(),
        IssueType::IpVersionMismatch => "IPv4/IPv6 compatibility problem".to_string(),
        IssueType::Timeout => "Network timeout".to_string(),
        IssueType::Connection => "Connection failed".to_string(),
        IssueType::Tls => "HTTPS/TLS handshake failed".to_string(),
        IssueType::HttpAuth => format!("API authentication failed ({})", code("401/403")),
        IssueType::HttpRateLimit => "API rate limited (429)".to_string(),
        IssueType::HttpClientError => format!("Client request error ({})", code("4xx")),
        IssueType::HttpServerError => format!("Server error ({})", code("5xx")),
        IssueType::HttpOther => format!("HTTP error ({})", code("unknown")),
        IssueType::Io => "Network I/O error".to_string(),
        IssueType::Unknown => "Unknown network error".to_string(),
    }
}

pub fn build_summary(
    issue_type: IssueType,
    http_status: Option<u16>,
    host: Option<&str>,
    message: Option<&str>,
) -> String {
    let h = host.unwrap_or(UNKNOWN_HOST);
    let code = |fallback: &str| {
        http_status
            .map(|c| c.to_string())
            .unwrap_or_else(|| fallback.to_string())
    };
    let from_message = || match message.filter(|m| !m.trim().is_empty()) {
        Some(m) => format!("Error: {}", m.chars().take(80).collect::<String>()),
        None => format!("Network failure talking to {h}."),
    };

    match issue_type {
        IssueType::NoNetwork => "The device currently has no usable network connection.".to_string(),
        IssueType::Dns => format!("Could not resolve {h} (DNS failure)."),
        IssueType::IpVersionMismatch => format!("Possible IPv4/IPv6 compatibility problem reaching {h}."),
        IssueType::Timeout => format!("Request to {h} timed out (poor network or slow server)."),
        IssueType::Connection => {
            format!("Could not establish a connection to {h} (refused, unreachable or reset).")
        }
        IssueType::Tls => format!("Secure connection to {h} failed (certificate, clock or proxy)."),
        IssueType::HttpAuth => format!(
            "Authentication rejected ({}): check the API key permissions.",
            code("401/403")
        ),
        IssueType::HttpRateLimit => {
            "Requests are being rate limited: poll less often or retry later.".to_string()
        }
        IssueType::HttpClientError => format!(
            "{h} answered {} (request or configuration may be wrong).",
            code("4xx")
        ),
        IssueType::HttpServerError => format!(
            "{h} answered {} (server or gateway failure).",
            code("5xx")
        ),
        IssueType::HttpOther | IssueType::Io | IssueType::Unknown => from_message(),
    }
}

/// Remediation hints for an issue type.
pub fn suggestions(issue_type: IssueType, diagnostic_trace: Option<&str>) -> Vec<&'static str> {
    match issue_type {
        IssueType::NoNetwork => vec![
            "Check that Wi-Fi or mobile data is connected and airplane mode is off",
            "A Wi-Fi network that is connected but offline may require a captive-portal login",
        ],
        IssueType::Dns => {
            let secure_failed = diagnostic_trace
                .map(|t| t.contains(SECURE_RESOLVER_FAILED_MARKER))
                .unwrap_or(false);
            vec![
                "Check that the site domain is correct and resolves from another device",
                "Check the router or carrier DNS (try switching networks)",
                "If private DNS is enabled, try setting it to automatic or off",
                if secure_failed {
                    "The secure DNS resolver failed: it may be blocked or unstable on this network"
                } else {
                    "If failures persist, focus on local DNS, private DNS and router DNS settings"
                },
            ]
        }
        IssueType::IpVersionMismatch => vec![
            "No IPv4 answer was found: the network may be IPv6-only or have poor IPv6 quality",
            "Try another network or review the router's IPv6 settings",
        ],
        IssueType::Timeout => vec![
            "Poor signal, packet loss or a slow server can cause timeouts",
            "Try another network; if frequent, check server load and response times",
        ],
        IssueType::Connection => vec![
            "The server port may be unreachable, firewalled, or resetting connections",
            "If reconnecting the network helps, router/NAT or carrier link instability is likely",
        ],
        IssueType::Tls => vec![
            "Check that the device clock is correct (a wrong clock breaks certificate checks)",
            "Proxies or inspection devices on the network can break certificate validation",
            "A misconfigured server certificate chain must be fixed on the server",
        ],
        IssueType::HttpAuth => vec![
            "Check consumer_key / consumer_secret and that their scopes allow the request",
        ],
        IssueType::HttpRateLimit => vec![
            "The server is rate limiting: lower the polling frequency or back off between retries",
        ],
        IssueType::HttpServerError => vec![
            "Server or gateway failure: check the shop, web server, proxy and firewall logs",
            "Occasional errors can be retried later; persistent ones need a server-side fix",
        ],
        IssueType::HttpClientError => vec![
            "Check the site URL, API path and request parameters",
            "404 usually means a wrong URL or path; 400 usually means bad parameters",
        ],
        IssueType::HttpOther => vec!["Check the status code and message returned by the server"],
        IssueType::Io => vec![
            "The connection was interrupted at the I/O level: compare with the snapshot and DNS probe",
        ],
        IssueType::Unknown => vec![
            "Try another network; if reproducible, export the logs for further analysis",
        ],
    }
}

/// Inputs of the detailed diagnosis report.
#[derive(Debug, Clone, Copy)]
pub struct DetailsContext<'a> {
    pub occurred_at_ms: i64,
    pub issue_type: IssueType,
    pub http_status: Option<u16>,
    pub endpoint: Option<&'a str>,
    pub site_host: Option<&'a str>,
    pub site_url: Option<&'a str>,
    pub failure_kind: &'a str,
    pub root_cause_kind: &'a str,
    pub message: Option<&'a str>,
    pub diagnostic_trace: Option<&'a str>,
    pub environment_snapshot: Option<&'a str>,
}

pub fn build_details(ctx: &DetailsContext<'_>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== Network Error Diagnosis ==");
    let _ = writeln!(out, "timeMs={}", ctx.occurred_at_ms);
    let _ = writeln!(out, "issueType={}", ctx.issue_type.name());
    if let Some(code) = ctx.http_status {
        let _ = writeln!(out, "httpStatus={code}");
    }
    let _ = writeln!(out, "endpoint={}", ctx.endpoint.unwrap_or(SENTINEL));
    let _ = writeln!(out, "siteHost={}", ctx.site_host.unwrap_or(SENTINEL));
    let _ = writeln!(out, "siteUrl={}", ctx.site_url.unwrap_or(SENTINEL));
    let _ = writeln!(out, "failure={}", ctx.failure_kind);
    let _ = writeln!(out, "rootCause={}", ctx.root_cause_kind);
    let _ = writeln!(out, "message={}", ctx.message.unwrap_or(SENTINEL));

    if let Some(trace) = ctx.diagnostic_trace.filter(|t| !t.trim().is_empty()) {
        let _ = writeln!(out);
        let _ = writeln!(out, "== Diagnostic Trace ==");
        let _ = writeln!(out, "{}", trace.trim());
    }

    if let Some(snapshot) = ctx.environment_snapshot.filter(|s| !s.trim().is_empty()) {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", snapshot.trim());
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "== Suggestions ==");
    for hint in suggestions(ctx.issue_type, ctx.diagnostic_trace) {
        let _ = writeln!(out, "- {hint}");
    }

    out.truncate(out.trim_end().len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(issue_type: IssueType) -> DetailsContext<'static> {
        DetailsContext {
            occurred_at_ms: 1_700_000_000_000,
            issue_type,
            http_status: None,
            endpoint: Some("orders"),
            site_host: Some("shop.example.com"),
            site_url: Some("https://shop.example.com"),
            failure_kind: "Io",
            root_cause_kind: "UnresolvedHost",
            message: Some("shop.example.com"),
            diagnostic_trace: None,
            environment_snapshot: None,
        }
    }

    #[test]
    fn fingerprint_layout_and_sentinels() {
        assert_eq!(
            fingerprint(IssueType::Dns, Some("shop.example.com"), None, "UnresolvedHost", None),
            "DNS|shop.example.com|-|UnresolvedHost|-"
        );
        assert_eq!(
            fingerprint(IssueType::HttpServerError, None, Some(502), "HttpStatus", None),
            "HTTP_SERVER_ERROR|unknown-host|502|HttpStatus|-"
        );
    }

    #[test]
    fn fingerprint_varies_one_field_at_a_time() {
        let base = fingerprint(IssueType::Timeout, Some("a.example"), None, "SocketTimeout", None);
        assert_ne!(base, fingerprint(IssueType::Timeout, Some("b.example"), None, "SocketTimeout", None));
        assert_ne!(base, fingerprint(IssueType::Io, Some("a.example"), None, "SocketTimeout", None));
        assert_ne!(base, fingerprint(IssueType::Timeout, Some("a.example"), Some(1), "SocketTimeout", None));
        assert_ne!(base, fingerprint(IssueType::Timeout, Some("a.example"), None, "Io", None));
        assert_ne!(
            base,
            fingerprint(IssueType::Timeout, Some("a.example"), None, "SocketTimeout", Some("read_timeout"))
        );
        assert_eq!(base, fingerprint(IssueType::Timeout, Some("a.example"), None, "SocketTimeout", None));
    }

    #[test]
    fn extra_keys_split_sub_signatures() {
        let trace = format!("step 1\n{SECURE_RESOLVER_FAILED_MARKER}: timeout");
        assert_eq!(
            fingerprint_extra_key(IssueType::Dns, Some(&trace), None),
            Some("secure_resolver_fail")
        );
        assert_eq!(
            fingerprint_extra_key(IssueType::IpVersionMismatch, Some(RESOLVER_FALLBACK_MARKER), None),
            Some("resolver_fallback")
        );
        assert_eq!(
            fingerprint_extra_key(IssueType::Tls, None, Some("Handshake failed")),
            Some("handshake")
        );
        assert_eq!(
            fingerprint_extra_key(IssueType::Tls, None, Some("bad certificate")),
            Some("cert")
        );
        assert_eq!(
            fingerprint_extra_key(IssueType::Timeout, None, Some("Read timed out")),
            Some("read_timeout")
        );
        assert_eq!(
            fingerprint_extra_key(IssueType::Timeout, None, Some("connect timed out")),
            Some("connect_timeout")
        );
        assert_eq!(fingerprint_extra_key(IssueType::Timeout, None, Some("timed out")), None);
        assert_eq!(fingerprint_extra_key(IssueType::Connection, Some(RESOLVER_FALLBACK_MARKER), None), None);
    }

    #[test]
    fn every_issue_type_has_title_summary_and_hints() {
        for issue in IssueType::ALL {
            assert!(!build_title(issue, None).is_empty());
            assert!(!build_summary(issue, None, None, None).is_empty());
            assert!(!suggestions(issue, None).is_empty());
        }
        assert!(build_title(IssueType::Dns, None).contains("DNS"));
        assert_eq!(build_title(IssueType::HttpServerError, Some(503)), "Server error (503)");
        assert_eq!(build_title(IssueType::HttpAuth, None), "API authentication failed (401/403)");
    }

    #[test]
    fn summary_falls_back_to_message() {
        let long = "x".repeat(200);
        let summary = build_summary(IssueType::Unknown, None, None, Some(&long));
        assert_eq!(summary, format!("Error: {}", "x".repeat(80)));
        assert_eq!(
            build_summary(IssueType::Io, None, Some("h"), None),
            "Network failure talking to h."
        );
    }

    #[test]
    fn dns_hint_depends_on_trace() {
        let with = suggestions(IssueType::Dns, Some(SECURE_RESOLVER_FAILED_MARKER));
        let without = suggestions(IssueType::Dns, None);
        assert_ne!(with.last(), without.last());
    }

    #[test]
    fn details_sections() {
        let mut ctx = context(IssueType::Dns);
        let plain = build_details(&ctx);
        assert!(plain.starts_with("== Network Error Diagnosis =="));
        assert!(plain.contains("issueType=DNS"));
        assert!(!plain.contains("httpStatus="));
        assert!(!plain.contains("== Diagnostic Trace =="));
        assert!(plain.contains("== Suggestions ==\n- "));
        assert_eq!(plain, plain.trim_end());

        ctx.http_status = Some(418);
        ctx.diagnostic_trace = Some("  resolver said no \n");
        ctx.environment_snapshot = Some("== Network Snapshot ==\ntransport=wifi\n\n");
        let full = build_details(&ctx);
        assert!(full.contains("httpStatus=418"));
        assert!(full.contains("== Diagnostic Trace ==\nresolver said no\n"));
        assert!(full.contains("== Network Snapshot ==\ntransport=wifi\n\n== Suggestions =="));
        assert!(!full.ends_with('\n'));
    }
}
