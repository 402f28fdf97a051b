/*============================================================
  Synavera Project: Syn-Net
  Module: synnet_core::store
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Bounded, deduplicated, persisted collection of unique
    network issues: upsert, trim, evict, observe and clear.

  Security / Safety Notes:
    Detail text is capped; oversized documents fall back to a
    smaller entry set instead of failing the write.

  Dependencies:
    serde / serde_json for the persisted layout, chrono for
    sample stamps, tokio-stream for the observation stream.

  Operational Scope:
    Owned by the logger facade; read by the operator binary
    and any UI listing recorded issues.

  Revision History:
    2026-10-19 COD  Authored error log store.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Corruption never blocks new writes
    - Entries always ordered most recently seen first
    - Store faults are logged, never raised
============================================================*/

use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::{Stream, StreamExt};

use crate::classifier::IssueType;
use crate::event::NetworkErrorEvent;
use crate::kv::{KeyValueStore, Mutation};
use crate::logger::Logger;

pub const DEFAULT_STORE_KEY: &str = "network_error_logs";
pub const SCHEMA_VERSION: u32 = 1;

pub const DEFAULT_MAX_UNIQUE_ENTRIES: usize = 50;
pub const MIN_UNIQUE_ENTRIES: usize = 10;
pub const MAX_UNIQUE_ENTRIES: usize = 200;
pub const DEFAULT_MAX_SAMPLES_PER_ENTRY: usize = 5;
pub const MIN_SAMPLES_PER_ENTRY: usize = 1;
pub const MAX_SAMPLES_PER_ENTRY: usize = 20;
pub const DEFAULT_MAX_DETAILS_CHARS: usize = 8000;
pub const DEFAULT_MAX_PAYLOAD_CHARS: usize = 512 * 1024;

/// One unique issue, keyed by fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkErrorLogEntry {
    pub fingerprint: String,
    pub issue_type: IssueType,
    pub title: String,
    pub summary: String,
    pub first_seen_at_ms: i64,
    pub last_seen_at_ms: i64,
    pub occurrence_count: u64,
    pub last_details: String,
    #[serde(default)]
    pub last_environment_snapshot: Option<String>,
    #[serde(default)]
    pub recent_samples: Vec<String>,
}

/// Size limits applied by [`ErrorLogStore::record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLimits {
    pub max_unique_entries: usize,
    pub max_samples_per_entry: usize,
    pub max_details_chars: usize,
    pub max_payload_chars: usize,
}

impl Default for RecordLimits {
    fn default() -> Self {
        Self {
            max_unique_entries: DEFAULT_MAX_UNIQUE_ENTRIES,
            max_samples_per_entry: DEFAULT_MAX_SAMPLES_PER_ENTRY,
            max_details_chars: DEFAULT_MAX_DETAILS_CHARS,
            max_payload_chars: DEFAULT_MAX_PAYLOAD_CHARS,
        }
    }
}

impl RecordLimits {
    /// Clamp entry and sample caps to their documented bounds.
    pub fn clamped(self) -> Self {
        Self {
            max_unique_entries: self
                .max_unique_entries
                .clamp(MIN_UNIQUE_ENTRIES, MAX_UNIQUE_ENTRIES),
            max_samples_per_entry: self
                .max_samples_per_entry
                .clamp(MIN_SAMPLES_PER_ENTRY, MAX_SAMPLES_PER_ENTRY),
            max_details_chars: self.max_details_chars.max(1),
            max_payload_chars: self.max_payload_chars.max(1),
        }
    }

    /// Entries kept when the full document exceeds the payload ceiling.
    pub fn degraded_entry_count(&self) -> usize {
        self.max_unique_entries.div_ceil(2).max(MIN_UNIQUE_ENTRIES)
    }
}

/// Entry list stream returned by [`ErrorLogStore::observe`].
pub type EntryStream = Pin<Box<dyn Stream<Item = Vec<NetworkErrorLogEntry>> + Send>>;

/// What a `record` call did to the persisted document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Written,
    /// Written with only the most recent entries, the full set was too large.
    Degraded,
    Skipped,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LogDocumentRef<'a> {
    schema_version: u32,
    entries: &'a [NetworkErrorLogEntry],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogDocument {
    schema_version: u32,
    entries: Vec<NetworkErrorLogEntry>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredLayout {
    Versioned(LogDocument),
    Legacy(Vec<NetworkErrorLogEntry>),
}

/// Parse the persisted document. Legacy bare arrays are accepted.
pub fn parse_entries(raw: &str) -> Result<Vec<NetworkErrorLogEntry>, String> {
    match serde_json::from_str::<StoredLayout>(raw) {
        Ok(StoredLayout::Versioned(doc)) if doc.schema_version == SCHEMA_VERSION => Ok(doc.entries),
        Ok(StoredLayout::Versioned(doc)) => Err(format!(
            "unsupported schema version {}",
            doc.schema_version
        )),
        Ok(StoredLayout::Legacy(entries)) => Ok(entries),
        Err(err) => Err(err.to_string()),
    }
}

/// Parse the persisted document, treating anything unreadable as empty.
pub fn decode_entries(raw: Option<&str>) -> Vec<NetworkErrorLogEntry> {
    raw.and_then(|body| parse_entries(body).ok()).unwrap_or_default()
}

fn encode_entries(entries: &[NetworkErrorLogEntry]) -> serde_json::Result<String> {
    serde_json::to_string(&LogDocumentRef {
        schema_version: SCHEMA_VERSION,
        entries,
    })
}

/// One-line sample: time, status or issue, host, endpoint.
pub fn sample_line(event: &NetworkErrorEvent) -> String {
    let when = DateTime::from_timestamp_millis(event.occurred_at_ms)
        .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| event.occurred_at_ms.to_string());
    let status = event
        .http_status
        .map(|code| code.to_string())
        .unwrap_or_else(|| event.issue_type.name().to_string());
    format!(
        "{when} {status} host={} ep={}",
        event.site_host.as_deref().unwrap_or("-"),
        event.endpoint.as_deref().unwrap_or("-")
    )
}

fn cap_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text.to_string(),
    }
}

/// Millisecond stamp leading a sample line; `None` for foreign layouts.
fn sample_time(sample: &str) -> Option<i64> {
    let stamp = sample.split_whitespace().next()?;
    DateTime::parse_from_rfc3339(stamp)
        .ok()
        .map(|ts| ts.timestamp_millis())
}

/// Insert in chronological order, skipping a copy of the preceding sample.
fn insert_sample(samples: &mut Vec<String>, sample: String, at_ms: i64) {
    let position = samples
        .iter()
        .rposition(|existing| sample_time(existing).map_or(true, |t| t <= at_ms))
        .map_or(0, |index| index + 1);
    if position > 0 && samples[position - 1] == sample {
        return;
    }
    samples.insert(position, sample);
}

/// Upsert `event` into `entries`, then sort newest first and evict to the cap.
pub fn apply_event(
    mut entries: Vec<NetworkErrorLogEntry>,
    event: &NetworkErrorEvent,
    limits: RecordLimits,
) -> Vec<NetworkErrorLogEntry> {
    let limits = limits.clamped();
    let sample = sample_line(event);
    let details = cap_chars(&event.details, limits.max_details_chars);

    match entries
        .iter_mut()
        .find(|entry| entry.fingerprint == event.fingerprint)
    {
        Some(entry) => {
            entry.occurrence_count = entry.occurrence_count.saturating_add(1);
            entry.first_seen_at_ms = entry.first_seen_at_ms.min(event.occurred_at_ms);
            // Reports may land out of order; only the newest one owns the text.
            if event.occurred_at_ms >= entry.last_seen_at_ms {
                entry.last_seen_at_ms = event.occurred_at_ms;
                entry.issue_type = event.issue_type;
                entry.title = event.title.clone();
                entry.summary = event.summary.clone();
                entry.last_details = details;
                entry.last_environment_snapshot = event.environment_snapshot.clone();
            }
            insert_sample(&mut entry.recent_samples, sample, event.occurred_at_ms);
            let overflow = entry
                .recent_samples
                .len()
                .saturating_sub(limits.max_samples_per_entry);
            entry.recent_samples.drain(..overflow);
        }
        None => entries.insert(
            0,
            NetworkErrorLogEntry {
                fingerprint: event.fingerprint.clone(),
                issue_type: event.issue_type,
                title: event.title.clone(),
                summary: event.summary.clone(),
                first_seen_at_ms: event.occurred_at_ms,
                last_seen_at_ms: event.occurred_at_ms,
                occurrence_count: 1,
                last_details: details,
                last_environment_snapshot: event.environment_snapshot.clone(),
                recent_samples: vec![sample],
            },
        ),
    }

    entries.sort_by(|a, b| b.last_seen_at_ms.cmp(&a.last_seen_at_ms));
    entries.truncate(limits.max_unique_entries);
    entries
}

/// Serialize `entries`, shrinking to the degraded set when over the ceiling.
fn encode_with_ceiling(
    entries: &[NetworkErrorLogEntry],
    limits: RecordLimits,
) -> serde_json::Result<(String, RecordOutcome)> {
    let full = encode_entries(entries)?;
    if full.chars().count() <= limits.max_payload_chars {
        return Ok((full, RecordOutcome::Written));
    }
    let keep = limits.degraded_entry_count().min(entries.len());
    let reduced = encode_entries(&entries[..keep])?;
    Ok((reduced, RecordOutcome::Degraded))
}

/// Persisted log of unique network issues under one key.
pub struct ErrorLogStore {
    kv: Arc<dyn KeyValueStore>,
    key: String,
    logger: Arc<Logger>,
}

impl ErrorLogStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, logger: Arc<Logger>) -> Self {
        Self::with_key(kv, DEFAULT_STORE_KEY, logger)
    }

    pub fn with_key(kv: Arc<dyn KeyValueStore>, key: impl Into<String>, logger: Arc<Logger>) -> Self {
        Self {
            kv,
            key: key.into(),
            logger,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Stream of the entry list: the current list first, then one per change.
    pub async fn observe(&self) -> EntryStream {
        match self.kv.subscribe(&self.key).await {
            Ok(rx) => Box::pin(WatchStream::new(rx).map(|raw| decode_entries(raw.as_deref()))),
            Err(err) => {
                self.logger
                    .warn("STORE", format!("Cannot observe `{}`: {err}", self.key));
                Box::pin(tokio_stream::once(Vec::new()))
            }
        }
    }

    /// Current entries, newest first. Empty on any read or parse failure.
    pub async fn entries(&self) -> Vec<NetworkErrorLogEntry> {
        match self.kv.get(&self.key).await {
            Ok(raw) => decode_entries(raw.as_deref()),
            Err(err) => {
                self.logger
                    .warn("STORE", format!("Cannot read `{}`: {err}", self.key));
                Vec::new()
            }
        }
    }

    /// Drop the persisted document.
    pub async fn clear(&self) {
        if let Err(err) = self.kv.remove(&self.key).await {
            self.logger
                .error("STORE", format!("Failed to clear `{}`: {err}", self.key));
        }
    }

    /// Upsert one event inside the store's exclusive update section.
    pub async fn record(&self, event: &NetworkErrorEvent, limits: RecordLimits) -> RecordOutcome {
        let limits = limits.clamped();
        let event = event.clone();
        let logger = self.logger.clone();
        let (outcome_tx, outcome_rx) = oneshot::channel();

        let update = self
            .kv
            .update(
                &self.key,
                Box::new(move |current: Option<String>| {
                    let existing = match current.as_deref().map(parse_entries) {
                        None => Vec::new(),
                        Some(Ok(entries)) => entries,
                        Some(Err(err)) => {
                            logger.warn("STORE", format!("Discarding unreadable log document: {err}"));
                            Vec::new()
                        }
                    };
                    let entries = apply_event(existing, &event, limits);
                    match encode_with_ceiling(&entries, limits) {
                        Ok((body, outcome)) => {
                            if outcome == RecordOutcome::Degraded {
                                logger.warn(
                                    "STORE",
                                    format!(
                                        "Log document over {} chars; kept {} most recent entries",
                                        limits.max_payload_chars,
                                        limits.degraded_entry_count().min(entries.len())
                                    ),
                                );
                            }
                            let _ = outcome_tx.send(outcome);
                            Mutation::Put(body)
                        }
                        Err(err) => {
                            logger.error("STORE", format!("Failed to serialize log document: {err}"));
                            let _ = outcome_tx.send(RecordOutcome::Skipped);
                            Mutation::Keep
                        }
                    }
                }),
            )
            .await;

        match update {
            Ok(()) => outcome_rx.await.unwrap_or(RecordOutcome::Skipped),
            Err(err) => {
                self.logger
                    .error("STORE", format!("Failed to record into `{}`: {err}", self.key));
                RecordOutcome::Skipped
            }
        }
    }
}
