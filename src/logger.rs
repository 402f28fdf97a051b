/*============================================================
  Synavera Project: Syn-Net
  Module: synnet_core::logger
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Local diagnostic channel for Syn-Net-Core. Failures the
    pipeline swallows end up here instead of at the caller.

  Security / Safety Notes:
    Callers pass sanitized text only; the logger itself does
    not inspect or persist failure payloads.

  Dependencies:
    std::sync::Mutex, chrono for UTC stamps, sha2 for the
    session digest.

  Operational Scope:
    Shared by the error log store, the logger facade and the
    operator binary. Supports stderr, an append-only file and
    an in-memory capture sink.

  Revision History:
    2024-11-04 COD  Established logging module.
    2026-10-19 COD  Added capture sink and diagnostic codes.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Append-only logging with UTC timestamps
    - Deterministic formatting for auditability
    - Logging never panics the caller
============================================================*/

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{SecondsFormat, Utc};
use sha2::{Digest, Sha256};

use crate::error::{Result, SynnetError};

/// Structured log level for Syn-Net-Core events.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Debug,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Debug => "DEBUG",
        }
    }
}

/// Shared logger that emits append-only entries in Synavera format.
pub struct Logger {
    file: Option<Mutex<BufWriter<File>>>,
    path: Option<PathBuf>,
    capture: Option<Mutex<Vec<String>>>,
    verbose: bool,
    quiet: bool,
}

impl Logger {
    /// Build a logger that writes to stderr and optionally to a file.
    pub fn new(path: Option<PathBuf>, verbose: bool) -> Result<Self> {
        let file = if let Some(ref file_path) = path {
            if let Some(parent) = file_path.parent() {
                std::fs::create_dir_all(parent).map_err(|err| {
                    SynnetError::Storage(format!(
                        "Failed to create log directory {}: {err}",
                        parent.display()
                    ))
                })?;
            }

            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(file_path)
                .map_err(|err| {
                    SynnetError::Storage(format!(
                        "Failed to open log file {}: {err}",
                        file_path.display()
                    ))
                })?;
            Some(Mutex::new(BufWriter::new(file)))
        } else {
            None
        };

        Ok(Self {
            file,
            path,
            capture: None,
            verbose,
            quiet: false,
        })
    }

    /// Logger that keeps every line in memory and prints nothing.
    pub fn capture() -> Self {
        Self {
            file: None,
            path: None,
            capture: Some(Mutex::new(Vec::new())),
            verbose: true,
            quiet: true,
        }
    }

    /// Emit a log entry with the given level, code, and message.
    pub fn log<S: AsRef<str>>(&self, level: LogLevel, code: &str, message: S) {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let payload = format!(
            "{timestamp} [{}] [{}] {}",
            level.as_str(),
            code,
            message.as_ref()
        );

        if !self.quiet && (self.verbose || level == LogLevel::Error || level == LogLevel::Warn) {
            eprintln!("{payload}");
        }

        if let Some(capture) = &self.capture {
            if let Ok(mut lines) = capture.lock() {
                lines.push(payload.clone());
            }
        }

        if let Some(file) = &self.file {
            if let Ok(mut guard) = file.lock() {
                if writeln!(guard, "{payload}").is_err() {
                    eprintln!(
                        "{} [{}] [LOGGER] Failed to write to log file",
                        timestamp,
                        LogLevel::Error.as_str()
                    );
                }
                if guard.flush().is_err() {
                    eprintln!(
                        "{} [{}] [LOGGER] Failed to flush log writer",
                        timestamp,
                        LogLevel::Warn.as_str()
                    );
                }
            }
        }
    }

    /// Convenience wrapper for `INFO` level events.
    pub fn info<S: AsRef<str>>(&self, code: &str, message: S) {
        self.log(LogLevel::Info, code, message);
    }

    /// Convenience wrapper for `WARN` level events.
    pub fn warn<S: AsRef<str>>(&self, code: &str, message: S) {
        self.log(LogLevel::Warn, code, message);
    }

    /// Convenience wrapper for `ERROR` level events.
    pub fn error<S: AsRef<str>>(&self, code: &str, message: S) {
        self.log(LogLevel::Error, code, message);
    }

    /// Convenience wrapper for `DEBUG` level events.
    pub fn debug<S: AsRef<str>>(&self, code: &str, message: S) {
        self.log(LogLevel::Debug, code, message);
    }

    /// Lines retained by a capture logger; empty for other sinks.
    pub fn captured(&self) -> Vec<String> {
        self.capture
            .as_ref()
            .and_then(|capture| capture.lock().ok().map(|lines| lines.clone()))
            .unwrap_or_default()
    }

    /// Return the path backing this logger, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Compute and persist SHA-256 digest of the log file.
    pub fn finalize(&self) -> Result<()> {
        if let Some(path) = self.path() {
            if let Some(file) = &self.file {
                if let Ok(mut guard) = file.lock() {
                    let _ = guard.flush();
                }
            }
            let data = std::fs::read(path).map_err(|err| {
                SynnetError::Storage(format!(
                    "Failed to read log for hashing {}: {err}",
                    path.display()
                ))
            })?;
            let digest = Sha256::digest(&data);
            let mut hash_os = path.as_os_str().to_os_string();
            hash_os.push(".hash");
            let hash_path = PathBuf::from(hash_os);
            let mut file = File::create(&hash_path).map_err(|err| {
                SynnetError::Storage(format!(
                    "Failed to create hash file {}: {err}",
                    hash_path.display()
                ))
            })?;
            writeln!(
                file,
                "{:x}  {}",
                digest,
                path.file_name().unwrap_or_default().to_string_lossy()
            )
            .map_err(|err| {
                SynnetError::Storage(format!(
                    "Failed to write hash file {}: {err}",
                    hash_path.display()
                ))
            })?;
        }
        Ok(())
    }
}
