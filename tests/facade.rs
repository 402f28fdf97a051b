use std::sync::Arc;
use std::time::Duration;

use synnet_core::failure::Annotation;
use synnet_core::kv::{KeyValueStore, Mutation};
use synnet_core::presentation::RESOLVER_FALLBACK_MARKER;
use synnet_core::store::DEFAULT_STORE_KEY;
use synnet_core::{
    export_all_text, ErrorLogStore, Failure, FailureKind, FileKeyValueStore, IssueType, Logger,
    MemoryKeyValueStore, NetworkErrorLogEntry, NetworkErrorLogger, ProbeSettings, RecordLimits,
    StaticSnapshotProvider,
};
use tokio::runtime::Handle;
use tokio_stream::StreamExt;

const SITE: &str = "https://shop.example.com";

fn facade_over(kv: Arc<dyn KeyValueStore>) -> (NetworkErrorLogger, Arc<Logger>) {
    let logger = Arc::new(Logger::capture());
    let store = Arc::new(ErrorLogStore::new(kv, logger.clone()));
    let facade = NetworkErrorLogger::new(
        store,
        Arc::new(StaticSnapshotProvider(
            "== Network Snapshot ==\ntransport=wifi\ndnsServers=192.168.1.1".into(),
        )),
        logger.clone(),
        Handle::current(),
    )
    .with_probe(ProbeSettings::disabled());
    (facade, logger)
}

fn dns_failure(message: &str) -> Failure {
    Failure::with_message(FailureKind::Io, "request failed")
        .caused_by(Failure::with_message(FailureKind::UnresolvedHost, message))
}

async fn wait_for<F>(facade: &NetworkErrorLogger, ready: F) -> Vec<NetworkErrorLogEntry>
where
    F: Fn(&[NetworkErrorLogEntry]) -> bool,
{
    let mut stream = facade.store().observe().await;
    tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(entries) = stream.next().await {
            if ready(&entries) {
                return entries;
            }
        }
        Vec::new()
    })
    .await
    .expect("store never reached the expected state")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn fire_and_forget_reports_are_merged() {
    let (facade, _) = facade_over(Arc::new(MemoryKeyValueStore::new()));

    for i in 0..3 {
        facade.log_failure(Some("orders"), Some(SITE), dns_failure(&format!("attempt {i}")));
    }

    let entries = wait_for(&facade, |entries| {
        entries.first().map(|e| e.occurrence_count) == Some(3)
    })
    .await;
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.issue_type, IssueType::Dns);
    assert_eq!(entry.fingerprint, "DNS|shop.example.com|-|UnresolvedHost|-");
    assert!(entry.last_details.contains("dnsServers=192.168.1.1"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reports_lose_no_updates() {
    let (facade, _) = facade_over(Arc::new(MemoryKeyValueStore::new()));

    let handles: Vec<_> = (0..40)
        .map(|i| {
            let failure = if i % 2 == 0 {
                Failure::http_status(429, "Too Many Requests")
            } else {
                Failure::with_message(FailureKind::SocketTimeout, "Read timed out")
            };
            facade.spawn_failure(Some("orders"), Some(SITE), failure)
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    let entries = facade.store().entries().await;
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.occurrence_count == 20));
    assert!(entries.iter().any(|e| e.issue_type == IssueType::HttpRateLimit));
    assert!(entries
        .iter()
        .any(|e| e.fingerprint == "TIMEOUT|shop.example.com|-|SocketTimeout|read_timeout"));
}

#[tokio::test]
async fn cancellations_never_reach_the_store() {
    let (facade, _) = facade_over(Arc::new(MemoryKeyValueStore::new()));
    facade
        .spawn_failure(None, Some(SITE), Failure::cancelled())
        .await
        .unwrap();
    assert!(facade.store().entries().await.is_empty());
}

#[tokio::test]
async fn trace_markers_split_dns_issues() {
    let (facade, _) = facade_over(Arc::new(MemoryKeyValueStore::new()));

    let plain = dns_failure("unable to resolve");
    let traced = dns_failure("unable to resolve").annotate(Annotation::Trace(
        synnet_core::failure::DiagnosticTrace::new(format!(
            "{RESOLVER_FALLBACK_MARKER} system resolver used"
        )),
    ));
    facade.record_failure(None, Some(SITE), plain).await.unwrap();
    facade.record_failure(None, Some(SITE), traced).await.unwrap();

    let entries = facade.store().entries().await;
    assert_eq!(entries.len(), 2);
    assert!(entries
        .iter()
        .any(|e| e.fingerprint.ends_with("|resolver_fallback")));
}

#[tokio::test]
async fn corrupted_store_recovers_on_next_report() {
    let kv = Arc::new(MemoryKeyValueStore::new());
    kv.update(
        DEFAULT_STORE_KEY,
        Box::new(|_: Option<String>| Mutation::Put("[{\"half\":".into())),
    )
    .await
    .unwrap();

    let (facade, _) = facade_over(kv);
    assert!(facade.store().entries().await.is_empty());

    facade
        .record_failure(None, Some(SITE), Failure::http_status(500, "Internal Server Error"))
        .await
        .unwrap();
    let entries = facade.store().entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].issue_type, IssueType::HttpServerError);
}

#[tokio::test]
async fn credentials_are_redacted_end_to_end() {
    let (facade, _) = facade_over(Arc::new(MemoryKeyValueStore::new()));
    let failure = Failure::with_message(
        FailureKind::ConnectRefused,
        "connect to https://shop.example.com/wp-json/wc/v3/orders?consumer_key=ck_live&consumer_secret=cs_live refused",
    );
    facade.record_failure(Some("orders"), Some(SITE), failure).await.unwrap();

    let export = export_all_text(&facade.store().entries().await);
    assert!(!export.contains("ck_live"));
    assert!(!export.contains("cs_live"));
    assert!(export.contains("consumer_key=***"));
}

#[tokio::test]
async fn file_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    {
        let (facade, _) = facade_over(Arc::new(FileKeyValueStore::new(dir.path())));
        let limits = RecordLimits {
            max_unique_entries: 10,
            ..RecordLimits::default()
        };
        let facade = facade.with_limits(limits);
        for code in [401u16, 403, 404, 500, 502] {
            facade
                .record_failure(None, Some(SITE), Failure::http_status(code, "status"))
                .await
                .unwrap();
        }
    }

    let (reopened, _) = facade_over(Arc::new(FileKeyValueStore::new(dir.path())));
    let entries = reopened.store().entries().await;
    assert_eq!(entries.len(), 5);
    assert!(entries
        .windows(2)
        .all(|pair| pair[0].last_seen_at_ms >= pair[1].last_seen_at_ms));
    // 401 and 403 share a title but not a fingerprint.
    assert_eq!(
        entries
            .iter()
            .filter(|e| e.issue_type == IssueType::HttpAuth)
            .count(),
        2
    );

    reopened.store().clear().await;
    assert!(reopened.store().entries().await.is_empty());
    assert!(!dir.path().join("network_error_logs.json").exists());
}
