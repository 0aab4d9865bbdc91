// src/history/transport.rs
//! Capabilities the job client needs from the outside world: HTTP and delay.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Status and body of a provider response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Minimal HTTP surface used against the snapshot provider.
/// `Err` means the request never produced a response.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post_json(
        &self,
        url: &str,
        bearer: &str,
        body: &serde_json::Value,
    ) -> Result<HttpResponse>;

    async fn get(&self, url: &str, bearer: &str) -> Result<HttpResponse>;
}

/// Suspends the calling task, not the process.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, d: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, d: Duration) {
        tokio::time::sleep(d).await;
    }
}

pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("property-yield/0.1")
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()
            .context("building reqwest client")?;
        Ok(Self { http })
    }

    async fn into_response(resp: reqwest::Response) -> Result<HttpResponse> {
        let status = resp.status().as_u16();
        let body = resp.text().await.context("reading provider response body")?;
        Ok(HttpResponse { status, body })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_json(
        &self,
        url: &str,
        bearer: &str,
        body: &serde_json::Value,
    ) -> Result<HttpResponse> {
        let resp = self
            .http
            .post(url)
            .bearer_auth(bearer)
            .json(body)
            .send()
            .await
            .context("provider POST")?;
        Self::into_response(resp).await
    }

    async fn get(&self, url: &str, bearer: &str) -> Result<HttpResponse> {
        let resp = self
            .http
            .get(url)
            .bearer_auth(bearer)
            .send()
            .await
            .context("provider GET")?;
        Self::into_response(resp).await
    }
}
