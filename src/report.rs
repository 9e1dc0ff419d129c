use std::collections::HashSet;

use futures_util::{stream, StreamExt, TryStreamExt};
use tracing::Instrument;

use crate::{
    config::ListingStrategy,
    mercadolibre::{
        data::{Description, Item, ListingPrice, PackageDimensions, ShippingOptions, ShippingQuery},
        Client,
    },
    Config, Error, ItemReport, Metrics,
};

/// A listing found by the search, before its details are known.
#[derive(Debug)]
enum Candidate {
    /// Only the identifier is known, details need to be loaded.
    Id(String),
    /// The search already returned every field the report needs.
    Summary(Item),
}

impl Candidate {
    fn from_summary(raw: serde_json::Value) -> Option<Self> {
        if let Some(item) = Item::from_complete_summary(&raw) {
            return Some(Self::Summary(item));
        }

        match raw.get("id").and_then(|id| id.as_str()) {
            Some(id) => {
                tracing::debug!("Incomplete summary for {}", id);
                Some(Self::Id(id.to_string()))
            }
            None => {
                tracing::warn!("Search result without an id");
                None
            }
        }
    }

    fn id(&self) -> &str {
        match self {
            Self::Id(id) => id,
            Self::Summary(item) => &item.id,
        }
    }
}

/// Builds the per-item report of the configured seller.
pub struct Aggregator {
    client: Client,
    metrics: Metrics,
    seller_id: String,
    site_id: String,
    strategy: ListingStrategy,
    concurrency: usize,
    page_size: usize,
}

impl Aggregator {
    pub fn new(config: &Config, client: Client, metrics: Metrics) -> Self {
        Self {
            client,
            metrics,
            seller_id: config.seller_id.clone(),
            site_id: config.site_id.clone(),
            strategy: config.listing_strategy,
            concurrency: config.concurrency.max(1),
            page_size: config.page_size.max(1),
        }
    }

    /// Loads every active listing of the seller and turns it into an
    /// [`ItemReport`], in the order the search returned them.
    ///
    /// The first failing upstream call aborts the whole report.
    #[tracing::instrument(name = "list_items", skip(self))]
    pub async fn list_items(&self) -> Result<Vec<ItemReport>, Error> {
        let start_time = std::time::Instant::now();

        match self.collect_reports().await {
            Ok(reports) => {
                tracing::info!("Built {} item reports in {:?}", reports.len(), start_time.elapsed());
                self.metrics.report_succeeded(reports.len());
                Ok(reports)
            }
            Err(e) => {
                tracing::error!("Building item reports: {}", e);
                self.metrics.report_failed();
                Err(e)
            }
        }
    }

    async fn collect_reports(&self) -> Result<Vec<ItemReport>, Error> {
        let candidates = self.resolve_candidates().await?;
        let total = candidates.len();

        stream::iter(candidates.into_iter().enumerate())
            .map(|(i, candidate)| {
                let span = tracing::info_span!(
                    "Building Item Report",
                    item = candidate.id(),
                    current = i + 1,
                    total_items = total
                );
                self.build_report(candidate).instrument(span)
            })
            .buffered(self.concurrency)
            .try_collect()
            .await
    }

    /// Walks all pages of the configured search, dropping repeated ids.
    async fn resolve_candidates(&self) -> Result<Vec<Candidate>, Error> {
        let mut candidates = Vec::new();
        let mut seen = HashSet::new();
        let mut offset = 0;

        loop {
            let (page, paging) = match self.strategy {
                ListingStrategy::SellerItems => {
                    let resp = self
                        .client
                        .search_seller_items(&self.seller_id, offset, self.page_size)
                        .await?;
                    let page: Vec<_> = resp
                        .results
                        .into_iter()
                        .map(|id| Some(Candidate::Id(id)))
                        .collect();
                    (page, resp.paging)
                }
                ListingStrategy::SiteSearch => {
                    let resp = self
                        .client
                        .search_site(&self.site_id, &self.seller_id, offset, self.page_size)
                        .await?;
                    let page: Vec<_> = resp.results.into_iter().map(Candidate::from_summary).collect();
                    (page, resp.paging)
                }
            };

            let fetched = page.len();
            for candidate in page.into_iter().flatten() {
                if candidate.id().is_empty() {
                    tracing::warn!("Skipping listing with empty id");
                    continue;
                }
                if seen.insert(candidate.id().to_string()) {
                    candidates.push(candidate);
                }
            }

            offset += fetched;
            match paging {
                Some(paging) if fetched > 0 && offset < paging.total => continue,
                _ => break,
            }
        }

        tracing::debug!("Found {} listings", candidates.len());

        Ok(candidates)
    }

    async fn build_report(&self, candidate: Candidate) -> Result<ItemReport, Error> {
        let (id, item) = match candidate {
            Candidate::Id(id) => {
                let item = self.client.load_item(&id).await?;
                (id, item)
            }
            Candidate::Summary(item) => (item.id.clone(), item),
        };

        let descriptions = self.client.load_descriptions(&id).await?;
        let description = first_description(&descriptions);

        let fees = self
            .client
            .load_listing_prices(
                &self.site_id,
                item.price,
                &item.listing_type_id,
                item.available_quantity,
            )
            .await?;
        let commission_amount = select_fee(&fees, &item.listing_type_id)
            .map(|fee| fee.sale_fee_amount)
            .unwrap_or(0.0);

        let shipping_cost = self.shipping_cost(&item).await?;

        Ok(ItemReport {
            id,
            title: item.title,
            description,
            price: item.price,
            available_quantity: item.available_quantity,
            sold_quantity: item.sold_quantity,
            listing_type_id: item.listing_type_id,
            commission_amount,
            shipping_cost,
            currency_id: item.currency_id,
            category_id: item.category_id,
        })
    }

    async fn shipping_cost(&self, item: &Item) -> Result<Option<f64>, Error> {
        if item.shipping.free_shipping {
            return Ok(Some(0.0));
        }

        let query = ShippingQuery {
            dimensions: item
                .package_dimensions
                .as_ref()
                .map(dimensions_descriptor)
                .unwrap_or_default(),
            item_price: item.price,
            listing_type_id: &item.listing_type_id,
            mode: item.shipping.mode.as_deref(),
            condition: item.condition.as_deref(),
            logistic_type: item.shipping.logistic_type.as_deref(),
        };

        let options = self
            .client
            .load_free_shipping_options(&self.seller_id, &query)
            .await?;

        Ok(shipping_cost_from(&options))
    }
}

/// The fee entry for `listing_type_id`, or the first entry if none matches.
pub fn select_fee<'f>(fees: &'f [ListingPrice], listing_type_id: &str) -> Option<&'f ListingPrice> {
    fees.iter()
        .find(|fee| fee.listing_type_id == listing_type_id)
        .or_else(|| fees.first())
}

pub fn shipping_cost_from(options: &ShippingOptions) -> Option<f64> {
    options
        .cost
        .or_else(|| options.costs.iter().find_map(|c| c.cost))
}

/// `{height}x{width}x{depth},{weight}`
pub fn dimensions_descriptor(dimensions: &PackageDimensions) -> String {
    format!(
        "{}x{}x{},{}",
        dimensions.height, dimensions.width, dimensions.depth, dimensions.weight
    )
}

pub fn first_description(descriptions: &[Description]) -> Option<String> {
    descriptions.first().and_then(|d| d.text.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mercadolibre::data::ShippingCost;

    fn fee(listing_type_id: &str, amount: f64) -> ListingPrice {
        ListingPrice {
            listing_type_id: listing_type_id.to_string(),
            sale_fee_amount: amount,
        }
    }

    #[test]
    fn fee_matching_listing_type() {
        let fees = [fee("free", 0.0), fee("gold_special", 130.0), fee("gold_pro", 160.0)];

        let selected = select_fee(&fees, "gold_pro").unwrap();
        assert_eq!("gold_pro", selected.listing_type_id);
        assert_eq!(160.0, selected.sale_fee_amount);
    }

    #[test]
    fn fee_falls_back_to_first() {
        let fees = [fee("gold_special", 130.0), fee("gold_pro", 160.0)];

        let selected = select_fee(&fees, "silver").unwrap();
        assert_eq!("gold_special", selected.listing_type_id);
    }

    #[test]
    fn fee_of_empty_schedule() {
        assert_eq!(None, select_fee(&[], "gold_pro"));
    }

    #[test]
    fn shipping_cost_prefers_direct_cost() {
        let options = ShippingOptions {
            cost: Some(10.0),
            costs: vec![ShippingCost { cost: Some(99.0) }],
        };

        assert_eq!(Some(10.0), shipping_cost_from(&options));
    }

    #[test]
    fn shipping_cost_first_non_null_in_list() {
        let options = ShippingOptions {
            cost: None,
            costs: vec![
                ShippingCost { cost: None },
                ShippingCost { cost: Some(42.5) },
                ShippingCost { cost: Some(50.0) },
            ],
        };

        assert_eq!(Some(42.5), shipping_cost_from(&options));
    }

    #[test]
    fn shipping_cost_unknown() {
        assert_eq!(None, shipping_cost_from(&ShippingOptions::default()));

        let options = ShippingOptions {
            cost: None,
            costs: vec![ShippingCost { cost: None }],
        };
        assert_eq!(None, shipping_cost_from(&options));
    }

    #[test]
    fn dimensions() {
        let dims = PackageDimensions {
            height: 10.0,
            width: 5.0,
            depth: 5.0,
            weight: 2.0,
        };
        assert_eq!("10x5x5,2", dimensions_descriptor(&dims));

        let dims = PackageDimensions {
            height: 10.5,
            width: 5.0,
            depth: 5.0,
            weight: 0.25,
        };
        assert_eq!("10.5x5x5,0.25", dimensions_descriptor(&dims));
    }

    #[test]
    fn description() {
        assert_eq!(None, first_description(&[]));

        let descriptions = [
            Description {
                text: Some("first".to_string()),
            },
            Description {
                text: Some("second".to_string()),
            },
        ];
        assert_eq!(Some("first".to_string()), first_description(&descriptions));
    }

    #[test]
    fn summary_candidates() {
        let complete = serde_json::json!({
            "id": "MLA1",
            "title": "Mate",
            "price": 100,
            "available_quantity": 1,
            "sold_quantity": 7,
            "listing_type_id": "gold_special",
            "currency_id": "ARS",
            "category_id": "MLA5",
            "shipping": { "free_shipping": false, "mode": "me2" },
            "package_dimensions": { "height": 10, "width": 5, "depth": 5, "weight": 2 }
        });
        match Candidate::from_summary(complete) {
            Some(Candidate::Summary(item)) => {
                assert_eq!(7, item.sold_quantity);
                assert!(item.package_dimensions.is_some());
            }
            other => panic!("unexpected {:?}", other),
        }

        let partial = serde_json::json!({ "id": "MLA2", "title": "Bombilla" });
        match Candidate::from_summary(partial) {
            Some(Candidate::Id(id)) => assert_eq!("MLA2", id),
            other => panic!("unexpected {:?}", other),
        }

        assert!(Candidate::from_summary(serde_json::json!({ "title": "no id" })).is_none());
    }

    #[test]
    fn summary_without_sold_quantity_needs_details() {
        // deserializes into `Item` on its own, but would default the missing fields
        let summary = serde_json::json!({
            "id": "MLA3",
            "title": "Yerba",
            "price": 3000,
            "available_quantity": 50,
            "listing_type_id": "gold_special",
            "currency_id": "ARS",
            "category_id": "MLA6",
            "shipping": { "free_shipping": false }
        });

        match Candidate::from_summary(summary) {
            Some(Candidate::Id(id)) => assert_eq!("MLA3", id),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn summary_with_null_dimensions_needs_details() {
        let summary = serde_json::json!({
            "id": "MLA4",
            "title": "Termo",
            "price": 25000,
            "available_quantity": 1,
            "sold_quantity": 3,
            "listing_type_id": "gold_pro",
            "currency_id": "ARS",
            "category_id": "MLA7",
            "shipping": { "free_shipping": false },
            "package_dimensions": null
        });

        assert!(matches!(
            Candidate::from_summary(summary),
            Some(Candidate::Id(_))
        ));
    }
}
