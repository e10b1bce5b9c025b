//! Apportions shared slab cost back to the products packed onto those slabs.

use std::collections::BTreeMap;

use crate::config::Settings;
use crate::packer::PackingResults;
use crate::sizer::{max_pieces_per_slab, price_independently};
use crate::types::{PackedGroup, PricingMode, Product, ProductResult, StoneVariant};

/// Placed area per contributing product index.
pub fn product_areas(group: &PackedGroup) -> BTreeMap<usize, f64> {
    let mut areas = BTreeMap::new();
    for p in &group.placed_pieces {
        *areas.entry(p.piece.product_index).or_insert(0.0) += p.footprint().area();
    }
    areas
}

/// Each contributing product's share of the group's placed area. Sums to 1.
pub fn area_ratios(group: &PackedGroup) -> BTreeMap<usize, f64> {
    let total = group.total_placed_area();
    if total <= 0.0 {
        return BTreeMap::new();
    }
    product_areas(group)
        .into_iter()
        .map(|(index, area)| (index, area / total))
        .collect()
}

fn allocate_group(
    products: &[Product],
    group: &PackedGroup,
    settings: &Settings,
) -> Vec<(usize, ProductResult)> {
    let variant = &group.variant;
    let slab = variant.slab();
    let total_slabs = group.total_slabs as f64;
    let total_material_cost = variant.slab_cost * settings.breakage_factor() * total_slabs;
    let total_area = group.total_placed_area();
    let kerf = settings.effective_kerf();

    product_areas(group)
        .into_iter()
        .filter_map(|(index, area)| {
            let product = products.get(index)?;
            if product.key() != group.key {
                tracing::warn!(product = index, group = %group.key, "product does not belong to group");
                return None;
            }
            let area_ratio = area / total_area;
            let usable_area_sqft = product.usable_area_sqft();
            let material_cost = total_material_cost * area_ratio;
            let fabrication_cost = if settings.include_fabrication {
                usable_area_sqft * variant.fab_cost_per_sqft
            } else {
                0.0
            };
            let installation_cost = if settings.include_installation {
                usable_area_sqft * settings.installation_rate_per_sqft
            } else {
                0.0
            };
            let raw_cost = material_cost + fabrication_cost + installation_cost;

            let effective_slabs = total_slabs * area_ratio;
            let effective_slab_area = effective_slabs * slab.area();
            let efficiency = if effective_slab_area > 0.0 {
                area / effective_slab_area * 100.0
            } else {
                0.0
            };

            Some((
                index,
                ProductResult {
                    mode: PricingMode::SharedSlabs,
                    usable_area_sqft,
                    slabs_needed: effective_slabs,
                    efficiency,
                    material_cost,
                    fabrication_cost,
                    installation_cost,
                    raw_cost,
                    final_price: raw_cost * variant.markup,
                    pieces_per_slab: max_pieces_per_slab(
                        product.width,
                        product.depth,
                        slab.w,
                        slab.h,
                        kerf,
                    ),
                    area_ratio: Some(area_ratio),
                },
            ))
        })
        .collect()
}

/// Prices every product from the packing results, aligned with `products`.
///
/// Products in a packed group get a share of that group's slab cost. Valid
/// products whose group failed are priced independently; invalid products,
/// and those that cannot be priced at all, get `None`.
pub fn apply_multi_product_optimization(
    products: &[Product],
    groups: &PackingResults,
    catalog: &[StoneVariant],
    settings: &Settings,
) -> Vec<Option<ProductResult>> {
    let mut results: Vec<Option<ProductResult>> = vec![None; products.len()];

    for group in groups.values().filter_map(|outcome| outcome.as_ref().ok()) {
        if group.total_placed_area() <= 0.0 {
            continue;
        }
        for (index, result) in allocate_group(products, group, settings) {
            results[index] = Some(result);
        }
    }

    for (index, product) in products.iter().enumerate() {
        if results[index].is_none() && product.is_valid() {
            tracing::debug!(product = index, "pricing product independently");
            results[index] = price_independently(product, catalog, settings);
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packer::optimize_multi_product_layout;

    fn catalog() -> Vec<StoneVariant> {
        vec![
            StoneVariant {
                stone_type: "Granite".into(),
                thickness: "3cm".into(),
                finish: "Polished".into(),
                slab_width: 126.0,
                slab_height: 63.0,
                slab_cost: 500.0,
                fab_cost_per_sqft: 30.0,
                markup: 2.0,
            },
            StoneVariant {
                stone_type: "Granite".into(),
                thickness: "2cm".into(),
                finish: "Polished".into(),
                slab_width: 120.0,
                slab_height: 60.0,
                slab_cost: 300.0,
                fab_cost_per_sqft: 20.0,
                markup: 1.2,
            },
        ]
    }

    fn granite(width: f64, depth: f64, quantity: u32) -> Product {
        Product {
            stone: "Granite".into(),
            thickness: "3cm".into(),
            finish: "Polished".into(),
            width,
            depth,
            quantity,
            ..Default::default()
        }
    }

    fn settings() -> Settings {
        Settings {
            include_kerf: true,
            kerf_width: 0.125,
            breakage_buffer: 10.0,
            include_fabrication: true,
            include_installation: false,
            ..Default::default()
        }
    }

    fn price(products: &[Product], settings: &Settings) -> Vec<Option<ProductResult>> {
        let groups = optimize_multi_product_layout(products, &catalog(), settings);
        apply_multi_product_optimization(products, &groups, &catalog(), settings)
    }

    #[test]
    fn test_material_cost_split_by_area() {
        // 100x60 pieces take a slab each; the 20x20 rides along on slab 0.
        let products = vec![granite(100.0, 60.0, 2), granite(20.0, 20.0, 1)];
        let results = price(&products, &settings());

        let big = results[0].as_ref().unwrap();
        let small = results[1].as_ref().unwrap();
        let total_area = 2.0 * 6000.0 + 400.0;

        // 500 * 1.10 * 2 slabs
        let total_material = 1100.0;
        assert!((big.material_cost - total_material * 12000.0 / total_area).abs() < 1e-9);
        assert!((small.material_cost - total_material * 400.0 / total_area).abs() < 1e-9);
        assert!((big.material_cost + small.material_cost - total_material).abs() < 1e-9);

        assert!((big.slabs_needed + small.slabs_needed - 2.0).abs() < 1e-9);
        assert_eq!(big.mode, PricingMode::SharedSlabs);
        assert_eq!(big.pieces_per_slab, 1);
    }

    #[test]
    fn test_price_formula_uses_exact_markup() {
        let products = vec![granite(30.0, 20.0, 2)];
        let results = price(&products, &settings());
        let r = results[0].as_ref().unwrap();

        let sqft = 30.0 * 20.0 / 144.0 * 2.0;
        assert!((r.usable_area_sqft - sqft).abs() < 1e-9);
        assert!((r.fabrication_cost - sqft * 30.0).abs() < 1e-9);
        assert!((r.raw_cost - (r.material_cost + r.fabrication_cost)).abs() < 1e-9);
        assert!((r.final_price - r.raw_cost * 2.0).abs() < 1e-9);
        assert_eq!(r.area_ratio, Some(1.0));
    }

    #[test]
    fn test_fabrication_and_installation_toggles() {
        let products = vec![granite(24.0, 72.0, 1)];
        let settings = Settings {
            include_fabrication: false,
            include_installation: true,
            installation_rate_per_sqft: 15.0,
            ..settings()
        };
        let results = price(&products, &settings);
        let r = results[0].as_ref().unwrap();
        assert_eq!(r.fabrication_cost, 0.0);
        assert!((r.installation_cost - 12.0 * 15.0).abs() < 1e-9);
        assert!((r.raw_cost - (r.material_cost + r.installation_cost)).abs() < 1e-9);
    }

    #[test]
    fn test_area_ratios_sum_to_one() {
        let products = vec![
            granite(96.0, 25.5, 2),
            granite(48.0, 22.0, 3),
            granite(18.0, 60.0, 4),
        ];
        let groups = optimize_multi_product_layout(&products, &catalog(), &settings());
        for group in groups.values().filter_map(|g| g.as_ref().ok()) {
            let sum: f64 = area_ratios(group).values().sum();
            assert!((sum - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_shared_efficiency_matches_group_utilisation() {
        let products = vec![granite(24.0, 96.0, 1), granite(24.0, 96.0, 1)];
        let results = price(&products, &settings());
        for r in results.iter().flatten() {
            assert!((r.slabs_needed - 0.5).abs() < 1e-9);
            let expected = 2.0 * 24.0 * 96.0 / (126.0 * 63.0) * 100.0;
            assert!((r.efficiency - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_failed_group_falls_back_to_independent() {
        let mut onyx = granite(30.0, 30.0, 1);
        onyx.stone = "Onyx".into();
        let mut oversized = granite(130.0, 70.0, 1);
        oversized.thickness = "2cm".into();
        let mut fits_2cm = granite(30.0, 30.0, 3);
        fits_2cm.thickness = "2cm".into();
        let products = vec![granite(30.0, 30.0, 1), onyx, oversized, fits_2cm];

        let results = price(&products, &settings());
        assert_eq!(results.len(), 4);
        assert_eq!(results[0].as_ref().unwrap().mode, PricingMode::SharedSlabs);
        // Catalog miss: no exact variant, so no price at all.
        assert!(results[1].is_none());
        // Unplaceable piece cannot be priced on its own either.
        assert!(results[2].is_none());
        // Same failed 2cm group, but this product can be sized on its own slab.
        let fallback = results[3].as_ref().unwrap();
        assert_eq!(fallback.mode, PricingMode::Independent);
        assert!((fallback.final_price - fallback.raw_cost * 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_products_get_none() {
        let products = vec![granite(30.0, 30.0, 0), granite(0.0, 30.0, 1), granite(30.0, 30.0, 1)];
        let results = price(&products, &settings());
        assert!(results[0].is_none());
        assert!(results[1].is_none());
        assert!(results[2].is_some());
    }
}
