//! Multi-product slab packing.
//!
//! Pieces from every product that shares an exact stone key are packed
//! together with a greedy first-fit heuristic: pieces are taken in priority
//! then size order and each goes onto the first slab (in opening order) with
//! room for it. This is fast and usually good, but it is not an optimal 2D
//! bin packer and can use more slabs than strictly necessary.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};

use crate::config::Settings;
use crate::error::GroupError;
use crate::placement::SlabLayout;
use crate::types::{PackedGroup, Piece, Product, StoneKey, StoneVariant, find_variant};

/// Packing outcome per stone group.
pub type PackingResults = BTreeMap<StoneKey, Result<PackedGroup, GroupError>>;

/// Expands valid products into pieces grouped by exact stone key. Pieces keep
/// product order within a group. Invalid products contribute nothing.
pub fn expand_pieces(products: &[Product]) -> BTreeMap<StoneKey, Vec<Piece>> {
    let mut groups: BTreeMap<StoneKey, Vec<Piece>> = BTreeMap::new();
    for (index, product) in products.iter().enumerate() {
        if !product.is_valid() {
            tracing::debug!(product = index, "skipping invalid product");
            continue;
        }
        let name = product.display_name(index);
        let edge_detail = if product.edge_detail.trim().is_empty() {
            "Eased".to_string()
        } else {
            product.edge_detail.clone()
        };
        let pieces = groups.entry(product.key()).or_default();
        for piece_index in 0..product.quantity {
            pieces.push(Piece {
                product_index: index,
                piece_index,
                width: product.width,
                depth: product.depth,
                name: name.clone(),
                edge_detail: edge_detail.clone(),
                priority: product.priority,
            });
        }
    }
    groups
}

/// State of one group's packing run. Owned by a single call and consumed
/// step by step: sort, pack, finish.
#[derive(Debug)]
pub struct PackingSession {
    key: StoneKey,
    variant: StoneVariant,
    kerf: f64,
    pieces: Vec<Piece>,
    slabs: Vec<SlabLayout>,
}

impl PackingSession {
    pub fn new(key: StoneKey, variant: StoneVariant, kerf: f64, pieces: Vec<Piece>) -> Self {
        Self {
            key,
            variant,
            kerf,
            pieces,
            slabs: Vec::new(),
        }
    }

    /// High priority first, then largest area first. Stable, so equal pieces
    /// keep input order.
    pub fn sorted(mut self) -> Self {
        self.pieces.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| b.area().total_cmp(&a.area()))
        });
        self
    }

    pub fn pack(mut self) -> Result<Self, GroupError> {
        let pieces = std::mem::take(&mut self.pieces);
        for piece in pieces {
            self.place(piece)?;
        }
        Ok(self)
    }

    fn place(&mut self, piece: Piece) -> Result<(), GroupError> {
        for slab in &mut self.slabs {
            if let Some(scored) = slab.find_best_placement(&piece) {
                slab.place(piece, scored);
                return Ok(());
            }
        }

        let mut slab = SlabLayout::new(self.variant.slab(), self.kerf, self.slabs.len());
        match slab.place_first(piece) {
            Ok(_) => {
                self.slabs.push(slab);
                Ok(())
            }
            Err(piece) => Err(GroupError::UnplaceablePiece {
                piece: piece.name,
                product_index: piece.product_index,
                width: piece.width,
                depth: piece.depth,
                slab_width: self.variant.slab_width,
                slab_height: self.variant.slab_height,
            }),
        }
    }

    pub fn finish(self) -> PackedGroup {
        let slabs: Vec<_> = self
            .slabs
            .into_iter()
            .map(SlabLayout::into_instance)
            .collect();
        let placed_pieces = slabs.iter().flat_map(|s| s.pieces.iter().cloned()).collect();
        let average_efficiency = if slabs.is_empty() {
            0.0
        } else {
            slabs.iter().map(|s| s.efficiency).sum::<f64>() / slabs.len() as f64
        };

        PackedGroup {
            key: self.key,
            variant: self.variant,
            total_slabs: slabs.len(),
            slabs,
            placed_pieces,
            average_efficiency,
        }
    }

    pub fn run(self) -> Result<PackedGroup, GroupError> {
        Ok(self.sorted().pack()?.finish())
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Packs one stone group against its exact catalog variant.
pub fn pack_group(
    key: &StoneKey,
    pieces: Vec<Piece>,
    catalog: &[StoneVariant],
    kerf: f64,
) -> Result<PackedGroup, GroupError> {
    let Some(variant) = find_variant(catalog, key) else {
        return Err(GroupError::CatalogMiss { key: key.clone() });
    };
    PackingSession::new(key.clone(), variant.clone(), kerf, pieces).run()
}

/// Runs `pack` once per group. A panic inside one group becomes
/// `GroupError::Internal` for that group only.
fn pack_isolated<F>(groups: BTreeMap<StoneKey, Vec<Piece>>, mut pack: F) -> PackingResults
where
    F: FnMut(&StoneKey, Vec<Piece>) -> Result<PackedGroup, GroupError>,
{
    groups
        .into_iter()
        .map(|(key, pieces)| {
            let piece_count = pieces.len();
            let outcome = match panic::catch_unwind(AssertUnwindSafe(|| pack(&key, pieces))) {
                Ok(result) => result,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    tracing::error!(group = %key, %message, "packing run panicked");
                    Err(GroupError::Internal { message })
                }
            };
            match &outcome {
                Ok(group) => tracing::debug!(
                    group = %key,
                    pieces = piece_count,
                    slabs = group.total_slabs,
                    efficiency = group.average_efficiency,
                    "packed stone group"
                ),
                Err(err) => tracing::warn!(group = %key, error = %err, "stone group not packed"),
            }
            (key, outcome)
        })
        .collect()
}

/// Packs every stone group in `products` onto shared slabs.
pub fn optimize_multi_product_layout(
    products: &[Product],
    catalog: &[StoneVariant],
    settings: &Settings,
) -> PackingResults {
    let kerf = settings.effective_kerf();
    pack_isolated(expand_pieces(products), |key, pieces| {
        pack_group(key, pieces, catalog, kerf)
    })
}
