// src/history/cache.rs
//! Retrieval cache: memoized, single-flight access to price history per listing.
//!
//! Each listing id owns one slot. The first request for an id spawns the job as its
//! own task and every request (first or later) only waits on the slot's result, so a
//! request that goes away never takes the job with it and the provider sees at most
//! one submission per id. Finished outcomes are served without touching the job client.

use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::client::JobClient;
use super::JobOutcome;
use crate::dataset::Dataset;
use crate::error::HistoryError;
use crate::ingest::types::ListingId;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "history_cache_hits_total",
            "Price history requests answered from the cache."
        );
        describe_counter!(
            "history_cache_misses_total",
            "Price history requests that started or joined a job."
        );
    });
}

#[derive(Debug, Clone)]
struct Finished {
    outcome: JobOutcome,
    at: Instant,
}

/// `None` while the job runs.
type Published = Option<Result<Finished, HistoryError>>;

#[derive(Clone)]
struct Slot {
    rx: watch::Receiver<Published>,
}

impl Slot {
    fn finished(&self) -> Option<Finished> {
        match &*self.rx.borrow() {
            Some(Ok(done)) => Some(done.clone()),
            _ => None,
        }
    }

    /// The job ended in a hard error, or its task went away without publishing.
    fn is_dead(&self) -> bool {
        let failed = self.rx.borrow().as_ref().map(Result::is_err);
        failed.unwrap_or_else(|| self.rx.has_changed().is_err())
    }

    async fn wait(mut self) -> Published {
        match self.rx.wait_for(Option::is_some).await {
            Ok(published) => Option::clone(&published),
            Err(_) => None,
        }
    }
}

pub struct RetrievalCache {
    dataset: Dataset,
    client: JobClient,
    slots: DashMap<ListingId, Slot>,
    ttl: Option<Duration>,
    /// Parent of every job's token; fired when the cache is dropped.
    jobs: CancellationToken,
}

impl RetrievalCache {
    /// `ttl = None` keeps outcomes for the lifetime of the cache.
    pub fn new(dataset: Dataset, client: JobClient, ttl: Option<Duration>) -> Self {
        ensure_metrics_described();
        Self {
            dataset,
            client,
            slots: DashMap::new(),
            ttl,
            jobs: CancellationToken::new(),
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Terminal outcome for `id`, running the job on first use.
    pub async fn get(&self, id: ListingId) -> Result<JobOutcome, HistoryError> {
        self.get_with_cancel(id, &CancellationToken::new()).await
    }

    /// Like [`RetrievalCache::get`], but the caller may stop waiting via `cancel`.
    ///
    /// Cancelling (or dropping this future) abandons only this caller's wait: the
    /// job runs on and its outcome is cached. A token cancelled on entry never
    /// starts a job.
    pub async fn get_with_cancel(
        &self,
        id: ListingId,
        cancel: &CancellationToken,
    ) -> Result<JobOutcome, HistoryError> {
        let listing = self.dataset.get(id).ok_or(HistoryError::NotFound(id))?;
        let detail_url = listing
            .detail_url
            .as_deref()
            .ok_or(HistoryError::MissingDetailUrl(id))?;

        if let Some(done) = self.cached(id) {
            counter!("history_cache_hits_total").increment(1);
            return Ok(done);
        }
        if cancel.is_cancelled() {
            return Err(HistoryError::Cancelled);
        }

        counter!("history_cache_misses_total").increment(1);
        let slot = self.slot(id, detail_url);
        let published = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(target: "history", id, "caller stopped waiting");
                return Err(HistoryError::Cancelled);
            }
            published = slot.wait() => published,
        };
        match published {
            Some(Ok(done)) => Ok(done.outcome),
            Some(Err(e)) => Err(e),
            None => Err(HistoryError::Cancelled),
        }
    }

    /// The live slot for `id`. A missing, expired or dead slot is replaced under the
    /// map entry, so only one job can start per id.
    fn slot(&self, id: ListingId, detail_url: &str) -> Slot {
        if let Some(s) = self.slots.get(&id) {
            if self.is_live(s.value()) {
                return s.value().clone();
            }
        }
        match self.slots.entry(id) {
            Entry::Occupied(mut e) => {
                if !self.is_live(e.get()) {
                    tracing::debug!(target: "history", id, "replacing stale slot");
                    e.insert(self.start(id, detail_url));
                }
                e.get().clone()
            }
            Entry::Vacant(v) => v.insert(self.start(id, detail_url)).value().clone(),
        }
    }

    /// Spawn the job for `id`; its result is published on the returned slot.
    fn start(&self, id: ListingId, detail_url: &str) -> Slot {
        let (tx, rx) = watch::channel(None);
        let client = self.client.clone();
        let detail_url = detail_url.to_string();
        let cancel = self.jobs.child_token();
        tokio::spawn(async move {
            tracing::info!(target: "history", id, "starting price history job");
            let result = client
                .run_with_cancel(&detail_url, &cancel)
                .await
                .map(|outcome| Finished {
                    outcome,
                    at: Instant::now(),
                });
            if let Err(e) = &result {
                tracing::warn!(target: "history", id, error = %e, "price history job aborted");
            }
            tx.send_replace(Some(result));
        });
        Slot { rx }
    }

    fn is_live(&self, slot: &Slot) -> bool {
        !slot.is_dead() && !self.is_expired(slot)
    }

    fn is_expired(&self, slot: &Slot) -> bool {
        match (self.ttl, slot.finished()) {
            (Some(ttl), Some(done)) => done.at.elapsed() >= ttl,
            _ => false,
        }
    }

    /// Finished outcome for `id`, if one is cached and fresh. Never starts a job.
    pub fn cached(&self, id: ListingId) -> Option<JobOutcome> {
        let slot = self.slots.get(&id)?;
        if self.is_expired(slot.value()) {
            return None;
        }
        slot.value().finished().map(|d| d.outcome)
    }

    /// Number of ids with a slot (finished or in flight).
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Drop every slot. Running jobs finish and their waiters still get the outcome.
    pub fn clear(&self) {
        self.slots.clear();
    }
}

impl Drop for RetrievalCache {
    fn drop(&mut self) {
        self.jobs.cancel();
    }
}
