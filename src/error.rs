//! # Error Taxonomy
//!
//! Five error families, matching the propagation rules a caller needs to
//! act on: a `Usage` error always means "print and exit(1)"; a `Timeout`
//! means "abandon this test but keep the process alive so results already
//! gathered can still be shown"; a `Protocol` error on the server means
//! "reject this connection, keep accepting"; `System` and `Internal` both
//! mean "print and exit(1)" but carry different diagnostic shapes.
//!
//! Call sites that need to branch on which family occurred match on this
//! enum directly; everywhere else `?` propagates it as a plain
//! `std::error::Error` (via `thiserror`) up to the `ExitCode`-returning
//! entry points in `main.rs`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QperfError {
    /// Bad option, missing argument, unknown test, or the client/server
    /// mode-selection ambiguity ("Do you want to be a client or server?").
    #[error("{0}")]
    Usage(String),

    /// A syscall-level failure: bind/accept/read/write/setsockopt.
    #[error("{context}: {source}")]
    System {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Version mismatch, sync mismatch, bad request index, malformed
    /// `/proc/stat`.
    #[error("{0}")]
    Protocol(String),

    /// A framed I/O deadline expired. Callers must treat this as
    /// `Successful = false` rather than propagate a process exit.
    #[error("timed out waiting for {0}")]
    Timeout(String),

    /// A broken invariant that should be unreachable in a correct build
    /// (e.g. the parameter catalogue out of index order).
    #[error("internal error: {0}")]
    Internal(String),
}

impl QperfError {
    /// True for the one family that must not abort the surrounding test
    /// run: a timeout unwinds the test body and suppresses results, but
    /// the process keeps running so `place_show` can still flush whatever
    /// was gathered before the deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, QperfError::Timeout(_))
    }

    /// True for the families the server treats as "reject this connection,
    /// keep accepting" rather than exit.
    pub fn is_recoverable_protocol_error(&self) -> bool {
        matches!(self, QperfError::Protocol(_) | QperfError::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, QperfError>;
