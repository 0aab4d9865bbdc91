//! Error types shared across the crate.

use thiserror::Error;

use crate::ingest::types::ListingId;

/// The dataset source itself could not be read.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("reading dataset {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing dataset: {0}")]
    Csv(#[from] csv::Error),
}

/// Hard failures of price history retrieval.
///
/// Provider outcomes (ready, empty, failed, timed out) are not errors; see
/// [`crate::history::JobOutcome`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("listing {0} not found")]
    NotFound(ListingId),
    #[error("listing {0} has no detail url")]
    MissingDetailUrl(ListingId),
    #[error("provider unreachable: {0}")]
    Transport(String),
    #[error("retrieval cancelled")]
    Cancelled,
}
