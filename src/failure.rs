/*============================================================
  Synavera Project: Syn-Net
  Module: synnet_core::failure
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Model transport failures as cause chains and carry
    auxiliary diagnostic text alongside them without altering
    the kind used for classification.

  Security / Safety Notes:
    Cause links may form cycles; every traversal tracks
    visited nodes by address and terminates.

  Dependencies:
    std only.

  Operational Scope:
    Produced by transport adapters, consumed by the classifier
    and event builder.

  Revision History:
    2026-10-19 COD  Introduced failure chains and trace carrier.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Total traversal over arbitrary chains
    - Annotations never change classification identity
============================================================*/

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Coarse kind of a transport failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FailureKind {
    UnresolvedHost,
    SocketTimeout,
    TlsHandshake,
    TlsPeerUnverified,
    Tls,
    ConnectRefused,
    NoRouteToHost,
    Socket,
    EndOfStream,
    Io,
    /// HTTP-level business error carrying the response status.
    HttpStatus(u16),
    Cancelled,
    Other(String),
}

impl FailureKind {
    /// Stable type name recorded as `failureKindName` / `rootCauseKindName`.
    pub fn name(&self) -> &str {
        match self {
            FailureKind::UnresolvedHost => "UnresolvedHost",
            FailureKind::SocketTimeout => "SocketTimeout",
            FailureKind::TlsHandshake => "TlsHandshake",
            FailureKind::TlsPeerUnverified => "TlsPeerUnverified",
            FailureKind::Tls => "Tls",
            FailureKind::ConnectRefused => "ConnectRefused",
            FailureKind::NoRouteToHost => "NoRouteToHost",
            FailureKind::Socket => "Socket",
            FailureKind::EndOfStream => "EndOfStream",
            FailureKind::Io => "Io",
            FailureKind::HttpStatus(_) => "HttpStatus",
            FailureKind::Cancelled => "Cancelled",
            FailureKind::Other(name) => name.as_str(),
        }
    }
}

/// Auxiliary text (typically a DNS resolution narrative) riding on a failure.
///
/// Holds the text and nothing else; no backtrace is captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticTrace(String);

impl DiagnosticTrace {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Non-causal side data attached to a failure node.
#[derive(Debug, Clone)]
pub enum Annotation {
    Trace(DiagnosticTrace),
    /// A secondary failure observed while handling this one.
    Suppressed(Arc<Failure>),
}

/// One node of a failure chain.
pub struct Failure {
    kind: FailureKind,
    message: Option<String>,
    cause: OnceLock<Arc<Failure>>,
    annotations: Vec<Annotation>,
}

impl Failure {
    pub fn new(kind: FailureKind, message: Option<String>) -> Self {
        Self {
            kind,
            message,
            cause: OnceLock::new(),
            annotations: Vec::new(),
        }
    }

    /// Failure with a message.
    pub fn with_message(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::new(kind, Some(message.into()))
    }

    /// HTTP-level business error for a non-success response.
    pub fn http_status(code: u16, message: impl Into<String>) -> Self {
        Self::with_message(FailureKind::HttpStatus(code), message)
    }

    pub fn cancelled() -> Self {
        Self::new(FailureKind::Cancelled, None)
    }

    /// Builder form of [`Failure::init_cause`].
    pub fn caused_by(self, cause: impl Into<Arc<Failure>>) -> Self {
        let _ = self.cause.set(cause.into());
        self
    }

    /// Attach a diagnostic trace to this node.
    pub fn with_trace(self, trace: impl Into<String>) -> Self {
        self.annotate(Annotation::Trace(DiagnosticTrace::new(trace)))
    }

    pub fn annotate(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Set the cause once after construction. Returns `false` if already set.
    ///
    /// Linking shared nodes this way can produce cycles.
    pub fn init_cause(&self, cause: Arc<Failure>) -> bool {
        self.cause.set(cause).is_ok()
    }

    pub fn kind(&self) -> &FailureKind {
        &self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn cause(&self) -> Option<&Failure> {
        self.cause.get().map(Arc::as_ref)
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Status code when this failure is an HTTP business error.
    pub fn http_code(&self) -> Option<u16> {
        match self.kind {
            FailureKind::HttpStatus(code) => Some(code),
            _ => None,
        }
    }

    pub fn is_cancellation(&self) -> bool {
        self.kind == FailureKind::Cancelled
    }

    /// Visit this node and its causes, each at most once.
    pub fn chain(&self) -> Chain<'_> {
        Chain {
            next: Some(self),
            seen: HashSet::new(),
        }
    }

    /// Innermost cause reachable without revisiting a node; `self` when no cause.
    ///
    /// On a cycle this is the last distinct node before the walk would loop:
    /// for `a -> b -> a`, `a.root_cause()` is `b`.
    pub fn root_cause(&self) -> &Failure {
        self.chain().last().unwrap_or(self)
    }

    /// First diagnostic trace found walking the cause chain.
    pub fn diagnostic_trace(&self) -> Option<&str> {
        self.chain().find_map(|node| {
            node.annotations.iter().find_map(|annotation| match annotation {
                Annotation::Trace(trace) => Some(trace.as_str()),
                Annotation::Suppressed(_) => None,
            })
        })
    }
}

/// Cycle-safe iterator over a cause chain.
pub struct Chain<'a> {
    next: Option<&'a Failure>,
    seen: HashSet<*const Failure>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a Failure;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        if !self.seen.insert(current as *const Failure) {
            return None;
        }
        self.next = current.cause();
        Some(current)
    }
}

impl fmt::Debug for Failure {
    // Causes are summarised, not recursed into: chains may be cyclic.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Failure")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .field("cause", &self.cause().map(|c| c.kind.name()))
            .field("annotations", &self.annotations.len())
            .finish()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {message}", self.kind.name()),
            None => f.write_str(self.kind.name()),
        }
    }
}

impl From<FailureKind> for Failure {
    fn from(kind: FailureKind) -> Self {
        Failure::new(kind, None)
    }
}
