// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod classify;
pub mod config;
pub mod dataset;
pub mod error;
pub mod history;
pub mod ingest;
pub mod metrics;
pub mod yields;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::classify::{classify, classify_listing, Bucket};
pub use crate::dataset::Dataset;
pub use crate::error::{HistoryError, IngestError};
pub use crate::history::{JobClient, JobOutcome, PricePoint, RetrievalCache};
pub use crate::ingest::normalize;
pub use crate::ingest::types::{Listing, ListingId, RawListing};

use anyhow::Context;
use std::sync::Arc;
use tracing::info;

use crate::config::AppConfig;
use crate::history::ReqwestTransport;

/// Load the dataset and wire the retrieval stack described by `cfg`.
pub fn build_state(cfg: &AppConfig) -> anyhow::Result<AppState> {
    let listings = ingest::load_listings(&cfg.dataset_path)
        .with_context(|| format!("loading dataset {}", cfg.dataset_path.display()))?;
    let dataset = Dataset::new(listings);
    info!(listings = dataset.len(), "dataset ready");

    let token = cfg.read_token()?;
    let transport = Arc::new(ReqwestTransport::new()?);
    let client = JobClient::new(transport, token, cfg.provider.clone(), cfg.poll);
    let cache = RetrievalCache::new(dataset, client, cfg.cache.ttl());

    Ok(AppState::new(cache))
}
