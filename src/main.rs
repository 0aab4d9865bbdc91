//! Property Yield Service: binary entrypoint
//! Loads the listing dataset and serves the JSON API behind the map front end.

use anyhow::Context;
use property_yield::{config::AppConfig, metrics::Metrics};
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact tracing logs; `RUST_LOG` overrides the default filter.
/// The runtime may have installed a subscriber already, in which case this is a no-op.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("property_yield=info,warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

async fn build_app() -> anyhow::Result<axum::Router> {
    // Recorder first, so the metric descriptions made while wiring the state land in it.
    let metrics = Metrics::install()
        .map_err(|e| tracing::warn!(error = ?e, "metrics disabled"))
        .ok();

    let cfg = AppConfig::load_default().context("loading app config")?;
    let state = property_yield::build_state(&cfg)?;

    let mut app = property_yield::router(state.clone());
    if let Some(m) = metrics {
        m.publish_dataset(state.dataset().len());
        app = app.merge(m.router());
    }
    Ok(app)
}

#[shuttle_runtime::main]
async fn main() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let app = build_app().await?;
    Ok(app.into())
}
