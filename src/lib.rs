/*============================================================
  Synavera Project: Syn-Net
  Module: synnet_core
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Network-failure diagnosis and deduplicated error log:
    classify failures, fingerprint them, keep a bounded set
    of unique issues with environment snapshots.

  Security / Safety Notes:
    Credential query parameters are redacted before storage.
    Reporting never raises to the caller.

  Dependencies:
    See Cargo.toml; tokio runtime required for the facade.

  Operational Scope:
    Linked by API clients and by the `synnet` operator binary.

  Revision History:
    2026-10-19 COD  Split library from the operator binary.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Pure classification, effectful edges isolated
    - Explicit module boundaries
============================================================*/

pub mod classifier;
pub mod config;
pub mod error;
pub mod event;
pub mod export;
pub mod facade;
pub mod failure;
pub mod kv;
pub mod logger;
pub mod presentation;
pub mod snapshot;
pub mod store;
pub mod transport;

pub use classifier::{classify, extract_host, sanitize_message, IssueType};
pub use config::SynnetConfig;
pub use error::{Result, SynnetError};
pub use event::{build_event, NetworkErrorEvent};
pub use export::{export_all_text, export_entry_text};
pub use facade::{NetworkErrorLogger, ProbeSettings};
pub use failure::{Failure, FailureKind};
pub use kv::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use logger::Logger;
pub use snapshot::{SnapshotProvider, StaticSnapshotProvider, SystemSnapshotProvider};
pub use store::{ErrorLogStore, NetworkErrorLogEntry, RecordLimits, RecordOutcome};
