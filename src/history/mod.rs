//! Historical price retrieval: submit-then-poll job client plus a per-listing
//! single-flight cache in front of it.

pub mod cache;
pub mod client;
pub mod response;
pub mod transport;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use cache::RetrievalCache;
pub use client::JobClient;
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport, Sleeper, TokioSleeper};

/// One observation of a price history, serialized with a `YYYY-MM-DD` date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

/// Terminal outcome of a price history job. All four are final answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    /// Points ordered by ascending date.
    Ready { points: Vec<PricePoint> },
    /// The provider has no history for this listing.
    Empty,
    Failed { reason: String },
    /// Poll bound reached before the snapshot became ready.
    TimedOut { polls: u32 },
}

impl JobOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            JobOutcome::Ready { .. } => "ready",
            JobOutcome::Empty => "empty",
            JobOutcome::Failed { .. } => "failed",
            JobOutcome::TimedOut { .. } => "timed_out",
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        JobOutcome::Failed {
            reason: reason.into(),
        }
    }
}

/// Lifecycle of one job. Transitions are strictly sequential; `Done` is terminal.
#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    NotStarted,
    Submitted { snapshot_id: String },
    Polling { snapshot_id: String, attempt: u32 },
    Done(JobOutcome),
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done(_))
    }
}
