use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};

use crate::{report::Aggregator, Error, ItemReport};

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub registry: prometheus::Registry,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/items", get(items))
        .route("/metrics", get(metrics))
        .route("/health", get(health))
        .with_state(state)
}

#[tracing::instrument(skip(state))]
async fn items(State(state): State<AppState>) -> Result<Json<Vec<ItemReport>>, Error> {
    tracing::debug!("Listing items");

    let reports = state.aggregator.list_items().await?;
    Ok(Json(reports))
}

#[tracing::instrument(skip(state))]
async fn metrics(State(state): State<AppState>) -> String {
    tracing::trace!("Getting metrics");

    let encoder = prometheus::TextEncoder::new();
    let metrics_families = state.registry.gather();
    match encoder.encode_to_string(&metrics_families) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("Encoding Metrics {:?}", e);

            String::new()
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
