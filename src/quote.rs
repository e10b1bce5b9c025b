//! One full pricing run: packing (or independent sizing), allocation and totals.

use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::allocator::apply_multi_product_optimization;
use crate::config::Settings;
use crate::error::GroupError;
use crate::packer::{PackingResults, optimize_multi_product_layout};
use crate::sizer::price_independently;
use crate::types::{PackedGroup, PricingMode, Product, ProductResult, SlabInstance, StoneKey, StoneVariant};

/// Everything a pricing run consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub products: Vec<Product>,
    #[serde(default)]
    pub catalog: Vec<StoneVariant>,
    #[serde(default)]
    pub settings: Settings,
}

impl QuoteRequest {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn run(&self) -> Quote {
        run_quote(&self.products, &self.catalog, &self.settings)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuoteSummary {
    pub total_price: f64,
    /// Whole slabs for packed groups plus slabs of independently priced products.
    pub total_slabs: f64,
    pub average_efficiency: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Quote {
    /// Empty when multi-product optimization is off.
    #[serde(serialize_with = "serialize_groups")]
    pub groups: PackingResults,
    /// One entry per input product, `None` when it could not be priced.
    pub products: Vec<Option<ProductResult>>,
    pub summary: QuoteSummary,
}

impl Quote {
    pub fn packed_groups(&self) -> impl Iterator<Item = &PackedGroup> {
        self.groups.values().filter_map(|g| g.as_ref().ok())
    }

    pub fn failed_groups(&self) -> impl Iterator<Item = (&StoneKey, &GroupError)> {
        self.groups
            .iter()
            .filter_map(|(key, g)| g.as_ref().err().map(|e| (key, e)))
    }
}

#[derive(Serialize)]
struct GroupReport<'a> {
    #[serde(flatten)]
    key: &'a StoneKey,
    #[serde(flatten)]
    status: GroupStatus<'a>,
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum GroupStatus<'a> {
    Packed {
        total_slabs: usize,
        average_efficiency: f64,
        slabs: &'a [SlabInstance],
    },
    Failed {
        kind: &'static str,
        error: String,
    },
}

fn serialize_groups<S: Serializer>(groups: &PackingResults, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(groups.iter().map(|(key, outcome)| GroupReport {
        key,
        status: match outcome {
            Ok(group) => GroupStatus::Packed {
                total_slabs: group.total_slabs,
                average_efficiency: group.average_efficiency,
                slabs: &group.slabs,
            },
            Err(err) => GroupStatus::Failed {
                kind: err.kind(),
                error: err.to_string(),
            },
        },
    }))
}

fn summarize(groups: &PackingResults, products: &[Option<ProductResult>]) -> QuoteSummary {
    let priced: Vec<&ProductResult> = products.iter().flatten().collect();
    let total_price: f64 = priced.iter().map(|r| r.final_price).sum();

    let packed: Vec<&PackedGroup> = groups.values().filter_map(|g| g.as_ref().ok()).collect();
    let independent: Vec<&ProductResult> = priced
        .iter()
        .copied()
        .filter(|r| r.mode == PricingMode::Independent)
        .collect();

    let total_slabs = packed.iter().map(|g| g.total_slabs as f64).sum::<f64>()
        + independent.iter().map(|r| r.slabs_needed).sum::<f64>();

    let efficiencies: Vec<f64> = packed
        .iter()
        .map(|g| g.average_efficiency)
        .chain(independent.iter().map(|r| r.efficiency))
        .collect();
    let average_efficiency = if efficiencies.is_empty() {
        0.0
    } else {
        efficiencies.iter().sum::<f64>() / efficiencies.len() as f64
    };

    QuoteSummary {
        total_price,
        total_slabs,
        average_efficiency,
    }
}

/// Prices `products` against `catalog`. Never fails: problems surface as
/// failed groups and `None` product entries.
pub fn run_quote(products: &[Product], catalog: &[StoneVariant], settings: &Settings) -> Quote {
    let (groups, results) = if settings.multi_product_optimization {
        let groups = optimize_multi_product_layout(products, catalog, settings);
        let results = apply_multi_product_optimization(products, &groups, catalog, settings);
        (groups, results)
    } else {
        let results = products
            .iter()
            .map(|p| price_independently(p, catalog, settings))
            .collect();
        (PackingResults::new(), results)
    };

    let summary = summarize(&groups, &results);
    tracing::info!(
        products = products.len(),
        priced = results.iter().flatten().count(),
        slabs = summary.total_slabs,
        total = summary.total_price,
        "quote computed"
    );

    Quote {
        groups,
        products: results,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const REQUEST: &str = r#"{
        "products": [
            {"stone": "Marble", "thickness": "3cm", "finish": "Polished", "width": "24", "depth": "96", "quantity": 1},
            {"stone": "Marble", "thickness": "3cm", "finish": "Polished", "width": 24, "depth": 96, "quantity": "1"},
            {"stone": "Marble", "thickness": "3cm", "finish": "Polished", "width": "0", "depth": 20}
        ],
        "catalog": [
            {"Stone Type": "Marble", "Thickness": "3cm", "Finish": "Polished",
             "Slab Width": 126, "Slab Height": 63, "Slab Cost": 500, "Fab Cost": 40, "Mark Up": 1.5}
        ],
        "settings": {"kerf_width": 0.125, "breakage_buffer": 10}
    }"#;

    #[test]
    fn test_request_round_through_run() {
        let quote = QuoteRequest::from_json(REQUEST).unwrap().run();
        assert_eq!(quote.products.len(), 3);
        assert!(quote.products[2].is_none());
        assert_eq!(quote.packed_groups().count(), 1);
        assert_eq!(quote.failed_groups().count(), 0);
        assert_eq!(quote.summary.total_slabs, 1.0);

        let expected_total: f64 = quote.products.iter().flatten().map(|r| r.final_price).sum();
        assert_eq!(quote.summary.total_price, expected_total);
    }

    #[test]
    fn test_independent_mode_has_no_groups() {
        let mut request = QuoteRequest::from_json(REQUEST).unwrap();
        request.settings.multi_product_optimization = false;
        let quote = request.run();
        assert!(quote.groups.is_empty());
        // Each 24x96 product takes its own slab when sizing independently.
        assert_eq!(quote.summary.total_slabs, 2.0);
        assert!(
            quote
                .products
                .iter()
                .flatten()
                .all(|r| r.mode == PricingMode::Independent)
        );
    }

    #[test]
    fn test_quote_serializes_group_status() {
        let mut request = QuoteRequest::from_json(REQUEST).unwrap();
        request.products.push(Product {
            stone: "Onyx".into(),
            width: 20.0,
            depth: 20.0,
            ..Default::default()
        });
        let quote = request.run();
        let json = serde_json::to_value(&quote).unwrap();
        let groups = json["groups"].as_array().unwrap();
        assert_eq!(groups.len(), 2);

        let marble = groups.iter().find(|g| g["stone_type"] == "Marble").unwrap();
        assert_eq!(marble["status"], "packed");
        assert_eq!(marble["total_slabs"], 1);

        let onyx = groups.iter().find(|g| g["stone_type"] == "Onyx").unwrap();
        assert_eq!(onyx["status"], "failed");
        assert_eq!(onyx["kind"], "catalog_miss");
        assert!(json["products"][2].is_null());
    }

    #[test]
    fn test_empty_request() {
        let quote = run_quote(&[], &[], &Settings::default());
        assert_eq!(
            quote.summary,
            QuoteSummary {
                total_price: 0.0,
                total_slabs: 0.0,
                average_efficiency: 0.0
            }
        );
    }
}
