/*============================================================
  Synavera Project: Syn-Net
  Module: synnet_core::event
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Turn one reported failure into a classified, fingerprinted
    and rendered network error event.

  Security / Safety Notes:
    Messages are sanitized here, before any text is rendered
    or persisted.

  Dependencies:
    std only.

  Operational Scope:
    Called by the logger facade on its background task.

  Revision History:
    2026-10-19 COD  Authored event builder.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Cancellation is not a network failure
    - Pure over its inputs; the clock is passed in
============================================================*/

use crate::classifier::{classify, extract_host, sanitize_message, IssueType};
use crate::failure::Failure;
use crate::presentation::{
    build_details, build_summary, build_title, fingerprint, fingerprint_extra_key, DetailsContext,
};

/// One reported failure, classified and rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkErrorEvent {
    pub fingerprint: String,
    pub occurred_at_ms: i64,
    pub endpoint: Option<String>,
    pub site_host: Option<String>,
    pub site_url: Option<String>,
    pub http_status: Option<u16>,
    pub failure_kind_name: String,
    pub root_cause_kind_name: String,
    pub message: Option<String>,
    pub diagnostic_trace: Option<String>,
    pub issue_type: IssueType,
    pub title: String,
    pub summary: String,
    pub details: String,
    pub environment_snapshot: Option<String>,
}

/// Build the event for `failure`, or `None` when the failure is a cancellation.
pub fn build_event(
    endpoint: Option<&str>,
    site_url: Option<&str>,
    failure: &Failure,
    environment_snapshot: Option<String>,
    occurred_at_ms: i64,
) -> Option<NetworkErrorEvent> {
    if failure.is_cancellation() || failure.root_cause().is_cancellation() {
        return None;
    }

    let site_host = extract_host(site_url);
    let http_status = failure.http_code();
    let root = failure.root_cause();
    let failure_kind_name = failure.kind().name().to_string();
    let root_cause_kind_name = root.kind().name().to_string();

    let diagnostic_trace = failure.diagnostic_trace().map(str::to_string);
    let message = sanitize_message(root.message().or_else(|| failure.message()));

    let issue_type = classify(
        failure,
        http_status,
        diagnostic_trace.as_deref(),
        message.as_deref(),
    );
    let extra_key =
        fingerprint_extra_key(issue_type, diagnostic_trace.as_deref(), message.as_deref());
    let fingerprint = fingerprint(
        issue_type,
        site_host.as_deref(),
        http_status,
        &root_cause_kind_name,
        extra_key,
    );

    let title = build_title(issue_type, http_status);
    let summary = build_summary(
        issue_type,
        http_status,
        site_host.as_deref(),
        message.as_deref(),
    );
    let details = build_details(&DetailsContext {
        occurred_at_ms,
        issue_type,
        http_status,
        endpoint,
        site_host: site_host.as_deref(),
        site_url,
        failure_kind: &failure_kind_name,
        root_cause_kind: &root_cause_kind_name,
        message: message.as_deref(),
        diagnostic_trace: diagnostic_trace.as_deref(),
        environment_snapshot: environment_snapshot.as_deref(),
    });

    Some(NetworkErrorEvent {
        fingerprint,
        occurred_at_ms,
        endpoint: endpoint.map(str::to_string),
        site_host,
        site_url: site_url.map(str::to_string),
        http_status,
        failure_kind_name,
        root_cause_kind_name,
        message,
        diagnostic_trace,
        issue_type,
        title,
        summary,
        details,
        environment_snapshot,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::FailureKind;
    use crate::presentation::SECURE_RESOLVER_FAILED_MARKER;

    fn dns_failure(message: &str) -> Failure {
        Failure::with_message(FailureKind::Io, "request failed")
            .caused_by(Failure::with_message(FailureKind::UnresolvedHost, message))
    }

    #[test]
    fn dns_scenario() {
        let event = build_event(
            Some("orders"),
            Some("https://shop.example.com"),
            &dns_failure("Unable to resolve host \"shop.example.com\""),
            None,
            1_000,
        )
        .unwrap();

        assert_eq!(event.issue_type, IssueType::Dns);
        assert!(event.title.contains("DNS"));
        assert_eq!(event.fingerprint.split('|').nth(1), Some("shop.example.com"));
        assert_eq!(event.fingerprint, "DNS|shop.example.com|-|UnresolvedHost|-");
        assert_eq!(event.failure_kind_name, "Io");
        assert_eq!(event.root_cause_kind_name, "UnresolvedHost");
        assert_eq!(event.http_status, None);
    }

    #[test]
    fn rate_limit_ignores_message() {
        let failure = Failure::http_status(429, "no network: dns error, handshake");
        let event = build_event(None, Some("https://shop.example.com"), &failure, None, 5).unwrap();
        assert_eq!(event.issue_type, IssueType::HttpRateLimit);
        assert_eq!(event.http_status, Some(429));
        assert_eq!(event.fingerprint, "HTTP_RATE_LIMIT|shop.example.com|429|HttpStatus|-");
    }

    #[test]
    fn cancellation_produces_nothing() {
        assert!(build_event(None, None, &Failure::cancelled(), None, 1).is_none());
        let wrapped = Failure::with_message(FailureKind::Io, "aborted").caused_by(Failure::cancelled());
        assert!(build_event(None, None, &wrapped, None, 1).is_none());
    }

    #[test]
    fn messages_differ_but_fingerprints_merge() {
        let a = build_event(None, Some("https://h.example"), &dns_failure("first"), None, 1).unwrap();
        let b = build_event(None, Some("https://h.example"), &dns_failure("second"), None, 2).unwrap();
        assert_ne!(a.message, b.message);
        assert_eq!(a.fingerprint, b.fingerprint);
    }

    #[test]
    fn trace_splits_fingerprint_and_lands_in_details() {
        let trace = format!("{SECURE_RESOLVER_FAILED_MARKER}: 8.8.8.8 unreachable");
        let failure = Failure::with_message(FailureKind::UnresolvedHost, "h.example").with_trace(trace);
        let event = build_event(None, Some("https://h.example"), &failure, Some("== Network Snapshot ==\ntransport=wifi".into()), 1).unwrap();

        assert!(event.fingerprint.ends_with("|secure_resolver_fail"));
        assert!(event.details.contains("== Diagnostic Trace =="));
        assert!(event.details.contains("transport=wifi"));
        assert_eq!(event.diagnostic_trace.as_deref(), Some("[secure-resolver] failed: 8.8.8.8 unreachable"));
    }

    #[test]
    fn credentials_never_reach_details() {
        let failure = Failure::with_message(
            FailureKind::SocketTimeout,
            "timeout for https://h.example/orders?consumer_key=abc123&consumer_secret=xyz789",
        );
        let event = build_event(None, None, &failure, None, 1).unwrap();
        assert!(!event.details.contains("abc123"));
        assert!(!event.details.contains("xyz789"));
        assert!(event.details.contains("consumer_key=***&consumer_secret=***"));
        assert_eq!(event.site_host, None);
        assert!(event.fingerprint.starts_with("TIMEOUT|unknown-host|-|SocketTimeout|"));
    }

    #[test]
    fn falls_back_to_outer_message() {
        let failure = Failure::with_message(FailureKind::Other("Wrapper".into()), "outer text")
            .caused_by(Failure::new(FailureKind::EndOfStream, None));
        let event = build_event(None, None, &failure, None, 1).unwrap();
        assert_eq!(event.message.as_deref(), Some("outer text"));
        assert_eq!(event.issue_type, IssueType::Io);
    }
}
