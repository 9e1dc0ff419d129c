use serde::{Deserialize, Serialize};

pub mod api;
pub mod config;
mod error;
pub mod mercadolibre;
mod metrics;
pub mod report;

pub use config::Config;
pub use error::Error;
pub use metrics::Metrics;

/// Flattened view of one listing of the seller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemReport {
    pub id: String,
    pub title: String,
    /// Text of the first description entry, if the listing has one.
    pub description: Option<String>,
    pub price: f64,
    pub available_quantity: u64,
    pub sold_quantity: u64,
    pub listing_type_id: String,
    /// Sale fee for the listing type, 0 when the fee schedule is empty.
    pub commission_amount: f64,
    /// `0.0` for free-shipping listings, `None` when the estimator had no cost.
    pub shipping_cost: Option<f64>,
    pub currency_id: String,
    pub category_id: String,
}

/// Wires the configured client, aggregator and metrics into the app state.
pub fn build_state(config: &Config) -> Result<api::AppState, StartupError> {
    let registry = prometheus::Registry::new();
    let metrics = Metrics::new(&registry)?;

    let client = mercadolibre::Client::new(config, metrics.clone())?;
    let aggregator = report::Aggregator::new(config, client, metrics);

    Ok(api::AppState {
        aggregator: std::sync::Arc::new(aggregator),
        registry,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("registering metrics: {0}")]
    Metrics(#[from] prometheus::Error),
    #[error("building http client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
