/*============================================================
  Synavera Project: Syn-Net
  Module: synnet_core::error
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Centralise plumbing error types for Syn-Net-Core: store
    I/O, configuration loading, and the operator binary.

  Security / Safety Notes:
    Error contexts carry paths and keys only; failure
    messages are sanitized before they reach persisted logs.

  Dependencies:
    thiserror for ergonomic error definitions.

  Operational Scope:
    Used by the key-value stores, configuration loader and
    binary. The diagnostic pipeline itself never returns
    these to `log_failure` callers.

  Revision History:
    2026-10-19 COD  Reworked error taxonomy for Syn-Net.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Explicit error taxonomy with actionable context
    - No silent failure paths outside the diagnostic core
    - Stable exit codes for operational tooling
============================================================*/

use std::io;
use std::process::ExitCode;

use thiserror::Error;

/// Result alias for Syn-Net-Core plumbing.
pub type Result<T> = std::result::Result<T, SynnetError>;

/// Enumerates high-level error domains surfaced by Syn-Net-Core.
#[derive(Debug, Error)]
pub enum SynnetError {
    #[error("Configuration: {0}")]
    Config(String),
    #[error("Storage: {0}")]
    Storage(String),
    #[error("Serialization: {0}")]
    Serialization(String),
    #[error("Network: {0}")]
    Network(String),
    #[error("Runtime: {0}")]
    Runtime(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl SynnetError {
    /// Map error category to a deterministic exit code.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            SynnetError::Config(_) => ExitCode::from(20),
            SynnetError::Network(_) => ExitCode::from(30),
            SynnetError::Serialization(_) => ExitCode::from(31),
            SynnetError::Storage(_) => ExitCode::from(40),
            SynnetError::Io(_) => ExitCode::from(41),
            SynnetError::Runtime(_) => ExitCode::from(50),
        }
    }
}

impl From<serde_json::Error> for SynnetError {
    fn from(err: serde_json::Error) -> Self {
        SynnetError::Serialization(err.to_string())
    }
}
