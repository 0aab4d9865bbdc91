// src/history/client.rs
//! Job client: drives one snapshot job from submission to a terminal outcome.

use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use tokio_util::sync::CancellationToken;

use super::response::{
    classify_snapshot_body, parse_price_history, parse_snapshot_id, SnapshotStatus,
};
use super::transport::{HttpTransport, Sleeper, TokioSleeper};
use super::{JobOutcome, JobState};
use crate::config::{PollConfig, ProviderConfig};
use crate::error::HistoryError;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "history_submissions_total",
            "Snapshot jobs submitted to the provider."
        );
        describe_counter!("history_polls_total", "Snapshot status requests issued.");
        describe_counter!(
            "history_outcomes_total",
            "Terminal job outcomes, labelled by outcome."
        );
    });
}

#[derive(Clone)]
pub struct JobClient {
    transport: Arc<dyn HttpTransport>,
    sleeper: Arc<dyn Sleeper>,
    token: String,
    provider: ProviderConfig,
    poll: PollConfig,
}

impl JobClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        token: impl Into<String>,
        provider: ProviderConfig,
        poll: PollConfig,
    ) -> Self {
        ensure_metrics_described();
        Self {
            transport,
            sleeper: Arc::new(TokioSleeper),
            token: token.into(),
            provider,
            poll,
        }
    }

    /// Replace the delay capability (tests use a recording sleeper).
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Run a job for `detail_url` to completion.
    pub async fn run(&self, detail_url: &str) -> Result<JobOutcome, HistoryError> {
        self.run_with_cancel(detail_url, &CancellationToken::new())
            .await
    }

    /// Like [`JobClient::run`], but gives up with `Cancelled` once `cancel` fires.
    /// Cancellation is observed at every poll boundary and during delays.
    pub async fn run_with_cancel(
        &self,
        detail_url: &str,
        cancel: &CancellationToken,
    ) -> Result<JobOutcome, HistoryError> {
        let mut state = JobState::NotStarted;
        loop {
            state = match self.step(state, detail_url, cancel).await? {
                JobState::Done(outcome) => {
                    counter!("history_outcomes_total", "outcome" => outcome.label()).increment(1);
                    tracing::info!(target: "history", outcome = outcome.label(), "job finished");
                    return Ok(outcome);
                }
                next => next,
            };
        }
    }

    /// Perform exactly one transition.
    pub async fn step(
        &self,
        state: JobState,
        detail_url: &str,
        cancel: &CancellationToken,
    ) -> Result<JobState, HistoryError> {
        if cancel.is_cancelled() {
            return Err(HistoryError::Cancelled);
        }
        match state {
            JobState::NotStarted => self.submit(detail_url).await,
            JobState::Submitted { snapshot_id } => {
                self.pause(self.poll.initial_delay(), cancel).await?;
                Ok(JobState::Polling {
                    snapshot_id,
                    attempt: 0,
                })
            }
            JobState::Polling {
                snapshot_id,
                attempt,
            } => self.poll_once(snapshot_id, attempt, cancel).await,
            done @ JobState::Done(_) => Ok(done),
        }
    }

    async fn submit(&self, detail_url: &str) -> Result<JobState, HistoryError> {
        let body = serde_json::json!([{ "url": detail_url }]);
        let resp = self
            .transport
            .post_json(&self.provider.trigger_url, &self.token, &body)
            .await
            .map_err(|e| HistoryError::Transport(format!("{e:#}")))?;
        counter!("history_submissions_total").increment(1);

        if !resp.is_success() {
            tracing::warn!(target: "history", status = resp.status, "submission rejected");
            return Ok(JobState::Done(JobOutcome::failed(format!(
                "submission error: provider returned {}",
                resp.status
            ))));
        }
        match parse_snapshot_id(&resp.body) {
            Some(snapshot_id) => {
                tracing::info!(target: "history", %snapshot_id, "snapshot submitted");
                Ok(JobState::Submitted { snapshot_id })
            }
            None => {
                tracing::warn!(target: "history", "submission response lacks snapshot_id");
                Ok(JobState::Done(JobOutcome::failed("submission error")))
            }
        }
    }

    async fn poll_once(
        &self,
        snapshot_id: String,
        attempt: u32,
        cancel: &CancellationToken,
    ) -> Result<JobState, HistoryError> {
        if attempt >= self.poll.max_polls {
            return Ok(JobState::Done(JobOutcome::TimedOut { polls: attempt }));
        }

        let url = self.provider.snapshot_url(&snapshot_id);
        let polls = attempt + 1;
        counter!("history_polls_total").increment(1);

        // The job exists at the provider now; a lost status request must not
        // turn into a re-submission, so it ends the job instead.
        let resp = match self.transport.get(&url, &self.token).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(target: "history", %snapshot_id, error = %e, "status request failed");
                return Ok(JobState::Done(JobOutcome::failed(format!(
                    "status request error: {e}"
                ))));
            }
        };

        match classify_snapshot_body(&resp.body) {
            SnapshotStatus::Empty => Ok(JobState::Done(JobOutcome::Empty)),
            SnapshotStatus::NotReady => {
                tracing::debug!(target: "history", %snapshot_id, polls, "snapshot not ready");
                if polls >= self.poll.max_polls {
                    return Ok(JobState::Done(JobOutcome::TimedOut { polls }));
                }
                self.pause(self.poll.interval(), cancel).await?;
                Ok(JobState::Polling {
                    snapshot_id,
                    attempt: polls,
                })
            }
            SnapshotStatus::Ready(_) if !resp.is_success() => {
                Ok(JobState::Done(JobOutcome::failed(format!(
                    "status request rejected: provider returned {}",
                    resp.status
                ))))
            }
            SnapshotStatus::Ready(csv) => match parse_price_history(csv) {
                Ok(points) => Ok(JobState::Done(JobOutcome::Ready { points })),
                Err(e) => Ok(JobState::Done(JobOutcome::failed(format!(
                    "unreadable price history: {e}"
                )))),
            },
        }
    }

    async fn pause(&self, d: Duration, cancel: &CancellationToken) -> Result<(), HistoryError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(HistoryError::Cancelled),
            _ = self.sleeper.sleep(d) => Ok(()),
        }
    }
}
