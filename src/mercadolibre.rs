use serde::de::DeserializeOwned;

use crate::{Config, Error, Metrics};

pub mod data;

/// Typed access to the MercadoLibre endpoints the report is built from.
///
/// Every call carries the configured bearer token and the configured timeout.
/// The first non-success response is turned into [`Error::Upstream`], nothing
/// is retried.
pub struct Client {
    req_client: reqwest::Client,
    base_url: String,
    token: String,
    metrics: Metrics,
}

impl Client {
    pub fn new(config: &Config, metrics: Metrics) -> Result<Self, reqwest::Error> {
        let req_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            req_client,
            base_url: config.api_base_url.clone(),
            token: config.access_token.clone(),
            metrics,
        })
    }

    async fn get<T>(
        &self,
        endpoint: &'static str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, Error>
    where
        T: DeserializeOwned,
    {
        let start_time = std::time::Instant::now();

        let resp = match self
            .req_client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await
        {
            Ok(r) => r,
            Err(source) => {
                self.metrics
                    .observe_upstream(endpoint, "error", start_time.elapsed());
                tracing::error!("Sending Request to {}: {:?}", endpoint, source);
                return Err(Error::Transport { endpoint, source });
            }
        };

        let status = resp.status();
        let raw_content = match resp.bytes().await {
            Ok(c) => c,
            Err(source) => {
                self.metrics
                    .observe_upstream(endpoint, "error", start_time.elapsed());
                tracing::error!("Reading Response of {}: {:?}", endpoint, source);
                return Err(Error::Transport { endpoint, source });
            }
        };

        self.metrics
            .observe_upstream(endpoint, status.as_str(), start_time.elapsed());

        if !status.is_success() {
            let body = String::from_utf8_lossy(&raw_content).into_owned();
            tracing::error!("Non Success Response from {}: {:?} {}", endpoint, status, body);
            return Err(Error::Upstream {
                endpoint,
                status,
                body,
            });
        }

        serde_json::from_slice(&raw_content).map_err(|source| {
            tracing::error!("Deserializing {}: {:?}", endpoint, source);
            Error::Decode { endpoint, source }
        })
    }

    /// One page of the seller's active listing identifiers.
    #[tracing::instrument(skip(self))]
    pub async fn search_seller_items(
        &self,
        seller_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<data::SearchResponse<String>, Error> {
        self.get(
            "seller_items_search",
            &format!("/users/{}/items/search", seller_id),
            &[
                ("status", "active".to_string()),
                ("offset", offset.to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }

    /// One page of the site search filtered by seller. The results are kept as
    /// raw JSON since their shape varies between listings.
    #[tracing::instrument(skip(self))]
    pub async fn search_site(
        &self,
        site_id: &str,
        seller_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<data::SearchResponse<serde_json::Value>, Error> {
        self.get(
            "site_search",
            &format!("/sites/{}/search", site_id),
            &[
                ("seller_id", seller_id.to_string()),
                ("offset", offset.to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn load_item(&self, item_id: &str) -> Result<data::Item, Error> {
        self.get("item", &format!("/items/{}", item_id), &[]).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn load_descriptions(&self, item_id: &str) -> Result<Vec<data::Description>, Error> {
        self.get("descriptions", &format!("/items/{}/descriptions", item_id), &[])
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn load_listing_prices(
        &self,
        site_id: &str,
        price: f64,
        listing_type_id: &str,
        quantity: u64,
    ) -> Result<Vec<data::ListingPrice>, Error> {
        self.get(
            "listing_prices",
            &format!("/sites/{}/listing_prices", site_id),
            &[
                ("price", price.to_string()),
                ("listing_type_id", listing_type_id.to_string()),
                ("quantity", quantity.to_string()),
            ],
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn load_free_shipping_options(
        &self,
        seller_id: &str,
        query: &data::ShippingQuery<'_>,
    ) -> Result<data::ShippingOptions, Error> {
        self.get(
            "free_shipping_options",
            &format!("/users/{}/shipping_options/free", seller_id),
            &query.params(),
        )
        .await
    }
}
