use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::dataset::{Dataset, ListingSummary};
use crate::error::HistoryError;
use crate::history::RetrievalCache;
use crate::ingest::types::ListingId;

#[derive(Clone)]
pub struct AppState {
    history: Arc<RetrievalCache>,
}

impl AppState {
    pub fn new(history: RetrievalCache) -> Self {
        Self {
            history: Arc::new(history),
        }
    }

    pub fn dataset(&self) -> &Dataset {
        self.history.dataset()
    }

    pub fn history(&self) -> &RetrievalCache {
        &self.history
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/listings", get(listings))
        .route("/listings/center", get(center))
        .route("/price_history/{id}", get(price_history))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn listings(State(state): State<AppState>) -> Json<Vec<ListingSummary>> {
    Json(state.dataset().summaries())
}

#[derive(serde::Serialize)]
struct CenterOut {
    latitude: f64,
    longitude: f64,
}

async fn center(State(state): State<AppState>) -> Json<Option<CenterOut>> {
    Json(
        state
            .dataset()
            .center()
            .map(|(latitude, longitude)| CenterOut {
                latitude,
                longitude,
            }),
    )
}

#[derive(serde::Serialize)]
struct ErrorOut {
    error: String,
}

fn status_for(e: &HistoryError) -> StatusCode {
    match e {
        HistoryError::NotFound(_) => StatusCode::NOT_FOUND,
        HistoryError::MissingDetailUrl(_) => StatusCode::UNPROCESSABLE_ENTITY,
        HistoryError::Transport(_) => StatusCode::BAD_GATEWAY,
        HistoryError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
    }
}

async fn price_history(State(state): State<AppState>, Path(id): Path<ListingId>) -> Response {
    match state.history().get(id).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => {
            tracing::warn!(target: "history", id, error = %e, "price history request failed");
            (status_for(&e), Json(ErrorOut { error: e.to_string() })).into_response()
        }
    }
}
