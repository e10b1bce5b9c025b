//! Single-product slab sizing and independent pricing.
//!
//! Sizing here only counts pieces; it never produces placements. It is used
//! when cross-product sharing is disabled and as the fallback for products
//! whose stone group could not be packed.

use crate::config::{EPS, Settings};
use crate::types::{PricingMode, Product, ProductResult, StoneVariant, find_variant};

/// Rows beyond this many make a mixed stack no better than the plain grids,
/// so the stacked sweep is skipped.
const MAX_STACKED_ROWS: u64 = 10_000;

/// How many `dim`-long pieces fit along `span` with `kerf` between neighbours.
fn fit_count(span: f64, dim: f64, kerf: f64) -> u64 {
    if span + EPS < dim {
        return 0;
    }
    ((span + kerf) / (dim + kerf) + EPS).floor() as u64
}

/// Height consumed by `rows` rows of height `row_h`, including the kerf
/// that separates the block from whatever is cut below it.
fn block_height(rows: u64, row_h: f64, kerf: f64) -> f64 {
    if rows == 0 {
        0.0
    } else {
        rows as f64 * (row_h + kerf)
    }
}

/// Best count over layouts that stack rows of `(a_w, a_h)` pieces first and
/// fill the remaining height with rows of `(b_w, b_h)` pieces.
fn best_stacked(a_w: f64, a_h: f64, b_w: f64, b_h: f64, slab_w: f64, slab_h: f64, kerf: f64) -> u64 {
    let per_row_a = fit_count(slab_w, a_w, kerf);
    let per_row_b = fit_count(slab_w, b_w, kerf);
    let max_rows_a = fit_count(slab_h, a_h, kerf);
    if max_rows_a > MAX_STACKED_ROWS {
        return 0;
    }

    (0..=max_rows_a)
        .map(|rows_a| {
            let remaining = slab_h - block_height(rows_a, a_h, kerf);
            let rows_b = if remaining > 0.0 {
                fit_count(remaining, b_h, kerf)
            } else {
                0
            };
            rows_a
                .saturating_mul(per_row_a)
                .saturating_add(rows_b.saturating_mul(per_row_b))
        })
        .max()
        .unwrap_or(0)
}

/// Estimate of how many `piece_w x piece_h` pieces one slab yields.
///
/// Tries the natural grid, the rotated grid, and both mixed-orientation row
/// stacks, returning the best count. Returns 0 when the piece cannot be cut
/// from the slab in either orientation.
///
/// Stricter than a pure upper bound: in a mixed stack the second block of
/// rows starts one kerf below the first, so a layout that only fits by
/// sharing that cut is not counted. Counts saturate at `u32::MAX`.
pub fn max_pieces_per_slab(piece_w: f64, piece_h: f64, slab_w: f64, slab_h: f64, kerf: f64) -> u32 {
    let dims = [piece_w, piece_h, slab_w, slab_h];
    if dims.iter().any(|d| !d.is_finite() || *d <= 0.0) {
        return 0;
    }
    let kerf = if kerf.is_finite() && kerf > 0.0 { kerf } else { 0.0 };

    let natural = fit_count(slab_w, piece_w, kerf).saturating_mul(fit_count(slab_h, piece_h, kerf));
    let swapped = fit_count(slab_w, piece_h, kerf).saturating_mul(fit_count(slab_h, piece_w, kerf));
    let natural_then_swapped = best_stacked(piece_w, piece_h, piece_h, piece_w, slab_w, slab_h, kerf);
    let swapped_then_natural = best_stacked(piece_h, piece_w, piece_w, piece_h, slab_w, slab_h, kerf);

    let best = natural
        .max(swapped)
        .max(natural_then_swapped)
        .max(swapped_then_natural);
    u32::try_from(best).unwrap_or(u32::MAX)
}

/// Prices a product on its own slabs, without sharing.
///
/// Returns `None` when the product is invalid, its exact stone variant is not
/// in the catalog, or a single piece cannot be cut from the slab.
pub fn price_independently(
    product: &Product,
    catalog: &[StoneVariant],
    settings: &Settings,
) -> Option<ProductResult> {
    if !product.is_valid() {
        return None;
    }
    let variant = find_variant(catalog, &product.key())?;
    let slab = variant.slab();

    let per_slab = max_pieces_per_slab(
        product.width,
        product.depth,
        slab.w,
        slab.h,
        settings.effective_kerf(),
    );
    if per_slab == 0 {
        tracing::debug!(
            product = %product.display_name(0),
            piece = %product.rect(),
            slab = %slab,
            "piece does not fit slab, no independent price"
        );
        return None;
    }

    let slabs = product.quantity.div_ceil(per_slab);
    let used_area = product.rect().area() * product.quantity as f64;
    let slab_area = slab.area() * slabs as f64;
    let efficiency = if slab_area > 0.0 {
        used_area / slab_area * 100.0
    } else {
        0.0
    };

    let usable_area_sqft = product.usable_area_sqft();
    let material_cost = variant.slab_cost * slabs as f64 * settings.breakage_factor();
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

    Some(ProductResult {
        mode: PricingMode::Independent,
        usable_area_sqft,
        slabs_needed: slabs as f64,
        efficiency,
        material_cost,
        fabrication_cost,
        installation_cost,
        raw_cost,
        final_price: raw_cost * variant.markup,
        pieces_per_slab: per_slab,
        area_ratio: None,
    })
}
