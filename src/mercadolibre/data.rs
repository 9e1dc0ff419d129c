use serde::Deserialize;

/// Envelope shared by the seller-items and the site search.
#[derive(Debug, PartialEq, Deserialize)]
pub struct SearchResponse<R> {
    pub results: Vec<R>,
    #[serde(default)]
    pub paging: Option<Paging>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Paging {
    pub total: usize,
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub limit: usize,
}

/*
{
    "id": "MLA1234567890",
    "title": "Mate de calabaza",
    "price": 15000,
    "available_quantity": 8,
    "sold_quantity": 31,
    "listing_type_id": "gold_special",
    "currency_id": "ARS",
    "category_id": "MLA1234",
    "condition": "new",
    "shipping": { "free_shipping": false, "mode": "me2", "logistic_type": "drop_off" },
    "package_dimensions": { "height": 10, "width": 5, "depth": 5, "weight": 2 },
    ...
}
*/
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Item {
    pub id: String,
    pub title: String,
    pub price: f64,
    pub available_quantity: u64,
    #[serde(default)]
    pub sold_quantity: u64,
    pub listing_type_id: String,
    pub currency_id: String,
    pub category_id: String,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub shipping: Shipping,
    #[serde(default)]
    pub package_dimensions: Option<PackageDimensions>,
}

/// Fields `Item` falls back to defaults for. A search summary has to carry
/// them explicitly before it can replace the `/items/{id}` payload.
const SUMMARY_REQUIRED_FIELDS: [&str; 3] = ["sold_quantity", "shipping", "package_dimensions"];

impl Item {
    /// The summary as an `Item`, or `None` if any field would be defaulted or
    /// is missing.
    pub fn from_complete_summary(raw: &serde_json::Value) -> Option<Self> {
        let complete = SUMMARY_REQUIRED_FIELDS
            .iter()
            .all(|field| raw.get(field).map_or(false, |v| !v.is_null()));
        if !complete {
            return None;
        }

        Self::deserialize(raw).ok()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Shipping {
    #[serde(default)]
    pub free_shipping: bool,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub logistic_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PackageDimensions {
    pub height: f64,
    pub width: f64,
    pub depth: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Description {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ListingPrice {
    pub listing_type_id: String,
    #[serde(default)]
    pub sale_fee_amount: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ShippingOptions {
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub costs: Vec<ShippingCost>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ShippingCost {
    #[serde(default)]
    pub cost: Option<f64>,
}

/// Query of the free-shipping cost estimator.
#[derive(Debug)]
pub struct ShippingQuery<'i> {
    pub dimensions: String,
    pub item_price: f64,
    pub listing_type_id: &'i str,
    pub mode: Option<&'i str>,
    pub condition: Option<&'i str>,
    pub logistic_type: Option<&'i str>,
}

impl ShippingQuery<'_> {
    /// Parameters without a value are left out entirely.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("dimensions", self.dimensions.clone()),
            ("verbose", "true".to_string()),
            ("item_price", self.item_price.to_string()),
            ("listing_type_id", self.listing_type_id.to_string()),
        ];

        let optional = [
            ("mode", self.mode),
            ("condition", self.condition),
            ("logistic_type", self.logistic_type),
        ];
        params.extend(
            optional
                .into_iter()
                .filter_map(|(key, value)| Some((key, value?.to_string()))),
        );

        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_with_missing_optionals() {
        let item: Item = serde_json::from_str(
            r#"{
                "id": "MLA1",
                "title": "Mate",
                "price": 1500.5,
                "available_quantity": 3,
                "listing_type_id": "gold_special",
                "currency_id": "ARS",
                "category_id": "MLA1234",
                "thumbnail": "http://example.com/t.jpg"
            }"#,
        )
        .unwrap();

        assert_eq!(0, item.sold_quantity);
        assert_eq!(Shipping::default(), item.shipping);
        assert_eq!(None, item.package_dimensions);
        assert_eq!(None, item.condition);
    }

    #[test]
    fn search_without_paging() {
        let resp: SearchResponse<String> =
            serde_json::from_str(r#"{"seller_id": "1", "results": ["MLA1", "MLA2"]}"#).unwrap();

        assert_eq!(vec!["MLA1".to_string(), "MLA2".to_string()], resp.results);
        assert_eq!(None, resp.paging);
    }

    #[test]
    fn shipping_options_with_null_costs() {
        let opts: ShippingOptions =
            serde_json::from_str(r#"{"costs": [{"cost": null}, {"cost": 12.5}]}"#).unwrap();

        assert_eq!(None, opts.cost);
        assert_eq!(2, opts.costs.len());
    }

    #[test]
    fn shipping_query_skips_absent_params() {
        let query = ShippingQuery {
            dimensions: String::new(),
            item_price: 100.0,
            listing_type_id: "gold_pro",
            mode: Some("me2"),
            condition: None,
            logistic_type: None,
        };

        let keys: Vec<_> = query.params().into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            vec!["dimensions", "verbose", "item_price", "listing_type_id", "mode"],
            keys
        );
    }
}
