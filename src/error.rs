// src/error.rs
//! Typed errors at the collaborator seams. Everything else degrades in
//! place: the aggregator absorbs failures into `null` report fields.

use std::time::Duration;

use thiserror::Error;

/// Failures of the external lookup collaborator (image/spec queries).
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("lookup timed out after {0:?}")]
    Timeout(Duration),
    #[error("upstream lookup failed: {0}")]
    Upstream(String),
}

/// Failures of a ledger storage backend.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A concurrent merge won the read-modify-write race. Retry-worthy:
    /// callers must re-read and re-merge, never drop the update.
    #[error("ledger update for '{product}' lost a concurrent merge race")]
    Conflict { product: String },
}
