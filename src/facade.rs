/*============================================================
  Synavera Project: Syn-Net
  Module: synnet_core::facade
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Fire-and-forget entry point for reporting network
    failures: snapshot, probe, classify, record, all on a
    background task.

  Security / Safety Notes:
    Never raises to the caller. Panics in the pipeline are
    contained by the runtime and logged. The resolution probe
    is bounded by a timeout.

  Dependencies:
    tokio for spawning, blocking offload and the resolver,
    chrono for the event clock.

  Operational Scope:
    Embedded by API clients at every failing call site.

  Revision History:
    2026-10-19 COD  Authored async logger facade.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Callers never block on diagnostics
    - Faults degrade to local log lines
============================================================*/

use std::fmt::Write;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::classifier::extract_host;
use crate::event::{build_event, NetworkErrorEvent};
use crate::failure::{Failure, FailureKind};
use crate::logger::Logger;
use crate::snapshot::{unavailable_snapshot, SnapshotProvider};
use crate::store::{ErrorLogStore, RecordLimits, RecordOutcome};

pub const PROBE_HEADER: &str = "== DNS Probe ==";

/// Host-resolution probe behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSettings {
    pub enabled: bool,
    pub timeout: Duration,
    pub port: u16,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout: Duration::from_secs(3),
            port: 443,
        }
    }
}

impl ProbeSettings {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Reports failures into an [`ErrorLogStore`] without blocking the caller.
#[derive(Clone)]
pub struct NetworkErrorLogger {
    store: Arc<ErrorLogStore>,
    snapshots: Arc<dyn SnapshotProvider>,
    logger: Arc<Logger>,
    runtime: Handle,
    limits: RecordLimits,
    probe: ProbeSettings,
}

impl NetworkErrorLogger {
    pub fn new(
        store: Arc<ErrorLogStore>,
        snapshots: Arc<dyn SnapshotProvider>,
        logger: Arc<Logger>,
        runtime: Handle,
    ) -> Self {
        Self {
            store,
            snapshots,
            logger,
            runtime,
            limits: RecordLimits::default(),
            probe: ProbeSettings::default(),
        }
    }

    pub fn with_limits(mut self, limits: RecordLimits) -> Self {
        self.limits = limits.clamped();
        self
    }

    pub fn with_probe(mut self, probe: ProbeSettings) -> Self {
        self.probe = probe;
        self
    }

    pub fn store(&self) -> &Arc<ErrorLogStore> {
        &self.store
    }

    /// Report a failure. Returns immediately; safe to call from any thread.
    pub fn log_failure(&self, endpoint: Option<&str>, site_url: Option<&str>, failure: Failure) {
        let _ = self.spawn_failure(endpoint, site_url, failure);
    }

    /// Like [`log_failure`](Self::log_failure), with a handle that resolves
    /// once the report has been processed.
    pub fn spawn_failure(
        &self,
        endpoint: Option<&str>,
        site_url: Option<&str>,
        failure: Failure,
    ) -> JoinHandle<()> {
        let occurred_at_ms = Utc::now().timestamp_millis();
        let this = self.clone();
        let endpoint = endpoint.map(str::to_string);
        let site_url = site_url.map(str::to_string);
        let pipeline = self.runtime.spawn(async move {
            this.record_failure_at(
                endpoint.as_deref(),
                site_url.as_deref(),
                failure,
                occurred_at_ms,
            )
            .await
        });

        let logger = self.logger.clone();
        self.runtime.spawn(async move {
            if let Err(err) = pipeline.await {
                logger.error("TASK", format!("Failure report aborted: {err}"));
            }
        })
    }

    /// Run the reporting pipeline inline. `None` when the failure was a
    /// cancellation and nothing was recorded.
    pub async fn record_failure(
        &self,
        endpoint: Option<&str>,
        site_url: Option<&str>,
        failure: Failure,
    ) -> Option<NetworkErrorEvent> {
        let occurred_at_ms = Utc::now().timestamp_millis();
        self.record_failure_at(endpoint, site_url, failure, occurred_at_ms)
            .await
    }

    /// Pipeline for a failure observed at `occurred_at_ms`.
    pub async fn record_failure_at(
        &self,
        endpoint: Option<&str>,
        site_url: Option<&str>,
        failure: Failure,
        occurred_at_ms: i64,
    ) -> Option<NetworkErrorEvent> {
        if failure.is_cancellation() || failure.root_cause().is_cancellation() {
            self.logger
                .debug("RECORD", format!("Skipped cancellation: {failure}"));
            return None;
        }

        let mut environment = self.collect_snapshot().await;

        let host = extract_host(site_url);
        if failure.http_code().is_none() && self.probe.enabled {
            if let Some(host) = host.as_deref() {
                let section = probe_host(host, self.probe).await;
                self.logger.debug("PROBE", section.replace('\n', " "));
                environment.push_str("\n\n");
                environment.push_str(&section);
            }
        }

        let event = build_event(endpoint, site_url, &failure, Some(environment), occurred_at_ms)?;

        match self.store.record(&event, self.limits).await {
            RecordOutcome::Written | RecordOutcome::Degraded => self.logger.info(
                "RECORD",
                format!("{} [{}]", event.title, event.fingerprint),
            ),
            RecordOutcome::Skipped => self.logger.warn(
                "RECORD",
                format!("Not persisted: [{}]", event.fingerprint),
            ),
        }
        Some(event)
    }

    async fn collect_snapshot(&self) -> String {
        let provider = self.snapshots.clone();
        match tokio::task::spawn_blocking(move || provider.snapshot_text()).await {
            Ok(text) => text,
            Err(err) => {
                self.logger
                    .warn("SNAPSHOT", format!("Snapshot provider failed: {err}"));
                unavailable_snapshot()
            }
        }
    }
}

/// Resolve `host` once and render the outcome as a report section.
pub async fn probe_host(host: &str, settings: ProbeSettings) -> String {
    let started = Instant::now();
    let lookup = tokio::time::timeout(
        settings.timeout,
        tokio::net::lookup_host((host, settings.port)),
    )
    .await;
    let elapsed_ms = started.elapsed().as_millis();

    let mut out = String::new();
    let _ = writeln!(out, "{PROBE_HEADER}");
    let _ = writeln!(out, "host={host}");
    match lookup {
        Ok(Ok(addrs)) => {
            let mut ips: Vec<IpAddr> = Vec::new();
            for addr in addrs {
                if !ips.contains(&addr.ip()) {
                    ips.push(addr.ip());
                }
            }
            let rendered: Vec<String> = ips.iter().map(IpAddr::to_string).collect();
            let _ = writeln!(out, "result=ok");
            let _ = writeln!(out, "addresses={}", rendered.join(","));
        }
        Ok(Err(err)) => {
            let _ = writeln!(out, "result=error");
            let _ = writeln!(out, "error={}", Failure::from_io(&err));
        }
        Err(_) => {
            let timeout = Failure::with_message(
                FailureKind::SocketTimeout,
                format!("no answer within {}ms", settings.timeout.as_millis()),
            );
            let _ = writeln!(out, "result=timeout");
            let _ = writeln!(out, "error={timeout}");
        }
    }
    let _ = write!(out, "elapsedMs={elapsed_ms}");
    out
}
