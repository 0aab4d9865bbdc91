// tests/metrics_export.rs
//
// The Prometheus recorder is installed before the retrieval stack is wired,
// so /metrics carries HELP lines for the history counters and the dataset gauge.
// Own test binary: the recorder is process-global.

mod common;

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
};
use tower::ServiceExt as _;

use property_yield::{metrics::Metrics, RetrievalCache};

use common::{dataset, job_client, FakeProvider, EMPTY};

#[tokio::test]
async fn descriptions_reach_the_exporter() {
    let metrics = Metrics::install().expect("first recorder in this process");

    let provider = Arc::new(FakeProvider::new().then(EMPTY));
    let cache = RetrievalCache::new(dataset(&[1, 2, 3]), job_client(provider, 5), None);
    metrics.publish_dataset(cache.dataset().len());
    cache.get(1).await.unwrap();

    let resp = metrics
        .router()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();

    assert!(text.contains("dataset_listings 3"), "{text}");
    assert!(text.contains("# HELP dataset_listings"), "{text}");
    assert!(text.contains("# HELP history_submissions_total"), "{text}");
    assert!(text.contains("# HELP history_cache_misses_total"), "{text}");
}
