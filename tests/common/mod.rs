// tests/common/mod.rs
// Shared fakes: a scripted snapshot provider and a sleeper that never sleeps.
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use property_yield::config::{PollConfig, ProviderConfig};
use property_yield::history::{HttpResponse, HttpTransport, Sleeper};
use property_yield::ingest::types::{Listing, ListingId, UNKNOWN_ADDRESS};
use property_yield::{Dataset, JobClient};

pub const NOT_READY: &str =
    r#"{"status":"building","message":"Snapshot is not ready yet, try again in 10s"}"#;
pub const EMPTY: &str = "Snapshot is empty";
pub const CSV: &str = "date,price,event\n\
                       2023-06-01,410000,Sold\n\
                       2019-02-11T00:00:00Z,\"$295,000\",Listed\n\
                       2021-09-30,350000,Sold\n";

#[derive(Default)]
pub struct FakeProvider {
    pub submissions: AtomicUsize,
    pub polls: AtomicUsize,
    pub submitted_bodies: Mutex<Vec<serde_json::Value>>,
    submit_reply: Mutex<Option<HttpResponse>>,
    unreachable: bool,
    submit_delay: Option<Duration>,
    statuses: Mutex<VecDeque<HttpResponse>>,
    /// Served once the scripted statuses run out.
    fallback: Mutex<Option<HttpResponse>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            submit_reply: Mutex::new(Some(HttpResponse::ok(r#"{"snapshot_id":"s_1"}"#))),
            ..Default::default()
        }
    }

    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Default::default()
        }
    }

    pub fn with_submit_reply(self, reply: HttpResponse) -> Self {
        *self.submit_reply.lock().unwrap() = Some(reply);
        self
    }

    pub fn with_submit_delay(mut self, d: Duration) -> Self {
        self.submit_delay = Some(d);
        self
    }

    pub fn then(self, body: &str) -> Self {
        self.statuses
            .lock()
            .unwrap()
            .push_back(HttpResponse::ok(body));
        self
    }

    pub fn always(self, body: &str) -> Self {
        *self.fallback.lock().unwrap() = Some(HttpResponse::ok(body));
        self
    }

    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpTransport for FakeProvider {
    async fn post_json(
        &self,
        _url: &str,
        _bearer: &str,
        body: &serde_json::Value,
    ) -> Result<HttpResponse> {
        if self.unreachable {
            return Err(anyhow!("connection refused"));
        }
        self.submissions.fetch_add(1, Ordering::SeqCst);
        self.submitted_bodies.lock().unwrap().push(body.clone());
        if let Some(d) = self.submit_delay {
            tokio::time::sleep(d).await;
        }
        let reply = self.submit_reply.lock().unwrap().clone();
        reply.ok_or_else(|| anyhow!("no submit reply scripted"))
    }

    async fn get(&self, _url: &str, _bearer: &str) -> Result<HttpResponse> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let next = self.statuses.lock().unwrap().pop_front();
        next.or_else(|| self.fallback.lock().unwrap().clone())
            .ok_or_else(|| anyhow!("no status scripted"))
    }
}

/// Records requested delays and only yields to the scheduler.
#[derive(Default)]
pub struct InstantSleeper {
    pub calls: AtomicUsize,
}

#[async_trait]
impl Sleeper for InstantSleeper {
    async fn sleep(&self, _d: Duration) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
    }
}

pub fn job_client(provider: Arc<FakeProvider>, max_polls: u32) -> JobClient {
    let cfg = ProviderConfig {
        trigger_url: "http://provider.test/trigger".into(),
        snapshot_url_base: "http://provider.test/snapshot".into(),
    };
    let poll = PollConfig {
        initial_delay_secs: 5,
        interval_secs: 10,
        max_polls,
    };
    JobClient::new(provider, "test-token", cfg, poll).with_sleeper(Arc::new(InstantSleeper::default()))
}

pub fn listing(id: ListingId, detail_url: Option<&str>) -> Listing {
    Listing {
        id,
        latitude: 40.7,
        longitude: -74.0,
        price: Some(300_000.0),
        market_value_estimate: Some(310_000.0),
        rent_estimate: Some(2_000.0),
        bedrooms: Some(3),
        bathrooms: Some(2),
        living_area_sqft: Some(1_400),
        street_address: UNKNOWN_ADDRESS.to_string(),
        is_off_market: false,
        detail_url: detail_url.map(str::to_string),
        annual_rent: None,
        gross_rental_yield_pct: None,
    }
}

pub fn dataset(ids: &[ListingId]) -> Dataset {
    Dataset::new(
        ids.iter()
            .map(|&id| listing(id, Some(&format!("https://www.zillow.com/homedetails/{id}_zpid/"))))
            .collect(),
    )
}
