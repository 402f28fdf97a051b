/*============================================================
  Synavera Project: Syn-Net
  Module: synnet_core::transport
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Translate real transport errors (std::io, reqwest and
    their source chains) into Syn-Net failure chains.

  Security / Safety Notes:
    Messages are copied verbatim here; redaction happens when
    the event is built.

  Dependencies:
    reqwest for HTTP client errors, libc for errno values.

  Operational Scope:
    Used by call sites that hand failures to the logger facade
    and by the operator binary's probe command.

  Revision History:
    2026-10-19 COD  Added io and reqwest adapters.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Kind inference is explicit and ordered
    - Foreign source chains are bounded
============================================================*/

use std::error::Error as StdError;
use std::io;

use crate::failure::{Failure, FailureKind};

/// Upper bound on foreign `source()` links converted into a chain.
const MAX_SOURCE_DEPTH: usize = 16;

impl From<io::Error> for Failure {
    fn from(err: io::Error) -> Self {
        Failure::from_io(&err)
    }
}

impl From<reqwest::Error> for Failure {
    fn from(err: reqwest::Error) -> Self {
        Failure::from_reqwest(&err)
    }
}

impl Failure {
    /// Convert an I/O error, including any wrapped inner error.
    pub fn from_io(err: &io::Error) -> Self {
        let failure = Failure::with_message(io_kind(err), err.to_string());
        match err.get_ref() {
            Some(inner) => match convert_source(inner, 1) {
                Some(cause) => failure.caused_by(cause),
                None => failure,
            },
            None => failure,
        }
    }

    /// Convert a reqwest error. Status errors become HTTP business errors.
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Failure::http_status(status.as_u16(), strip_url(err));
        }

        let kind = if err.is_timeout() {
            FailureKind::SocketTimeout
        } else if err.is_connect() {
            FailureKind::Socket
        } else if err.is_builder() {
            FailureKind::Other("RequestBuilder".into())
        } else {
            FailureKind::Io
        };

        let failure = Failure::with_message(kind, strip_url(err));
        match err.source().and_then(|source| convert_source(source, 1)) {
            Some(cause) => failure.caused_by(cause),
            None => failure,
        }
    }

    /// Convert an arbitrary error and its `source()` chain.
    pub fn from_error(err: &(dyn StdError + 'static)) -> Self {
        let message = err.to_string();
        convert_source(err, 0)
            .unwrap_or_else(|| Failure::with_message(infer_kind(&message), message.clone()))
    }
}

fn convert_source(err: &(dyn StdError + 'static), depth: usize) -> Option<Failure> {
    if depth > MAX_SOURCE_DEPTH {
        return None;
    }
    if let Some(io_err) = err.downcast_ref::<io::Error>() {
        return Some(Failure::from_io(io_err));
    }
    if let Some(req_err) = err.downcast_ref::<reqwest::Error>() {
        return Some(Failure::from_reqwest(req_err));
    }

    let message = err.to_string();
    let failure = Failure::with_message(infer_kind(&message), message);
    match err.source().and_then(|source| convert_source(source, depth + 1)) {
        Some(cause) => Some(failure.caused_by(cause)),
        None => Some(failure),
    }
}

fn io_kind(err: &io::Error) -> FailureKind {
    if let Some(code) = err.raw_os_error() {
        if code == libc::EHOSTUNREACH || code == libc::ENETUNREACH {
            return FailureKind::NoRouteToHost;
        }
    }
    match err.kind() {
        io::ErrorKind::TimedOut => FailureKind::SocketTimeout,
        io::ErrorKind::ConnectionRefused => FailureKind::ConnectRefused,
        io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::AddrNotAvailable
        | io::ErrorKind::AddrInUse => FailureKind::Socket,
        io::ErrorKind::UnexpectedEof => FailureKind::EndOfStream,
        io::ErrorKind::Interrupted => FailureKind::Io,
        _ => {
            // Custom io errors often wrap resolver or TLS text.
            match infer_kind(&err.to_string()) {
                FailureKind::Other(_) => FailureKind::Io,
                inferred => inferred,
            }
        }
    }
}

/// Best-effort kind from error text of foreign libraries (hyper, rustls, resolvers).
pub(crate) fn infer_kind(message: &str) -> FailureKind {
    let text = message.to_ascii_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|needle| text.contains(needle));

    if has(&[
        "dns error",
        "failed to lookup address",
        "name or service not known",
        "no such host",
        "nodename nor servname",
        "temporary failure in name resolution",
        "unable to resolve host",
    ]) {
        FailureKind::UnresolvedHost
    } else if has(&["certificate", "unknownissuer", "peer not authenticated"]) {
        FailureKind::TlsPeerUnverified
    } else if has(&["handshake"]) {
        FailureKind::TlsHandshake
    } else if has(&["tls", "ssl"]) {
        FailureKind::Tls
    } else if has(&["timed out", "timeout", "deadline has elapsed"]) {
        FailureKind::SocketTimeout
    } else if has(&["connection refused"]) {
        FailureKind::ConnectRefused
    } else if has(&["no route to host", "network is unreachable", "host is unreachable"]) {
        FailureKind::NoRouteToHost
    } else if has(&["connection reset", "broken pipe", "connection closed", "connection aborted"]) {
        FailureKind::Socket
    } else if has(&["unexpected eof", "end of file", "unexpected end"]) {
        FailureKind::EndOfStream
    } else {
        FailureKind::Other("UnknownError".into())
    }
}

fn strip_url(err: &reqwest::Error) -> String {
    // Query strings may carry credentials.
    let mut message = err.to_string();
    if let Some(url) = err.url() {
        message = message.replace(&format!(" for url ({url})"), "");
    }
    message
}
