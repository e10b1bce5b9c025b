//! Anchor-point placement of pieces on a slab in progress.

use crate::config::{EPS, SLIVER_PENALTY, SLIVER_THRESHOLD};
use crate::types::{Piece, PlacedPiece, Placement, Rect, SlabInstance};

/// A slab being filled during one packing run.
#[derive(Debug, Clone)]
pub struct SlabLayout {
    slab: Rect,
    kerf: f64,
    index: usize,
    pub pieces: Vec<PlacedPiece>,
}

/// A valid position for a piece together with its waste score (lower is better).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredPlacement {
    pub x: f64,
    pub y: f64,
    pub rotated: bool,
    pub score: f64,
}

impl SlabLayout {
    pub fn new(slab: Rect, kerf: f64, index: usize) -> Self {
        Self {
            slab,
            kerf,
            index,
            pieces: Vec::new(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn used_area(&self) -> f64 {
        self.pieces.iter().map(|p| p.footprint().area()).sum()
    }

    /// Occupied area over slab area, in percent.
    pub fn efficiency(&self) -> f64 {
        let slab_area = self.slab.area();
        if slab_area <= 0.0 {
            return 0.0;
        }
        self.used_area() / slab_area * 100.0
    }

    /// Origin plus the right, lower and diagonal neighbours of every placed
    /// piece, each one kerf away. Duplicates are dropped, first occurrence wins.
    fn anchors(&self) -> Vec<(f64, f64)> {
        let mut anchors = vec![(0.0, 0.0)];
        for p in &self.pieces {
            let fp = p.footprint();
            let right = p.placement.x + fp.w + self.kerf;
            let below = p.placement.y + fp.h + self.kerf;
            for anchor in [
                (right, p.placement.y),
                (p.placement.x, below),
                (right, below),
            ] {
                let seen = anchors
                    .iter()
                    .any(|a| (a.0 - anchor.0).abs() < EPS && (a.1 - anchor.1).abs() < EPS);
                if !seen {
                    anchors.push(anchor);
                }
            }
        }
        anchors
    }

    fn in_bounds(&self, x: f64, y: f64, fp: Rect) -> bool {
        x + fp.w <= self.slab.w + EPS && y + fp.h <= self.slab.h + EPS
    }

    /// True when a piece at `(x, y)` would come closer than one kerf to any placed piece.
    fn collides(&self, x: f64, y: f64, fp: Rect) -> bool {
        let k = self.kerf;
        self.pieces.iter().any(|p| {
            let ex = p.placement.x;
            let ey = p.placement.y;
            let efp = p.footprint();
            let separated = x + fp.w + k <= ex + EPS
                || x + EPS >= ex + efp.w + k
                || y + fp.h + k <= ey + EPS
                || y + EPS >= ey + efp.h + k;
            !separated
        })
    }

    /// Penalises leftover strips too narrow to cut anything from, then
    /// prefers positions near the top-left corner.
    fn waste_score(&self, x: f64, y: f64, fp: Rect) -> f64 {
        let right_gap = self.slab.w - (x + fp.w);
        let bottom_gap = self.slab.h - (y + fp.h);
        let is_sliver = |gap: f64| gap > EPS && gap < SLIVER_THRESHOLD;

        let mut score = x + y;
        if is_sliver(right_gap) {
            score += SLIVER_PENALTY;
        }
        if is_sliver(bottom_gap) {
            score += SLIVER_PENALTY;
        }
        score
    }

    /// Lowest-waste valid position for `piece` on this slab, trying both
    /// orientations at every anchor. Ties keep the first position found.
    pub fn find_best_placement(&self, piece: &Piece) -> Option<ScoredPlacement> {
        let rect = piece.rect();
        let orientations: &[bool] = if rect.is_square() {
            &[false]
        } else {
            &[false, true]
        };

        let mut best: Option<ScoredPlacement> = None;
        for (x, y) in self.anchors() {
            for &rotated in orientations {
                let fp = if rotated { rect.rotated() } else { rect };
                if !self.in_bounds(x, y, fp) || self.collides(x, y, fp) {
                    continue;
                }
                let score = self.waste_score(x, y, fp);
                if best.is_none_or(|b| score < b.score) {
                    best = Some(ScoredPlacement {
                        x,
                        y,
                        rotated,
                        score,
                    });
                }
            }
        }
        best
    }

    pub fn place(&mut self, piece: Piece, scored: ScoredPlacement) -> Placement {
        let placement = Placement {
            x: scored.x,
            y: scored.y,
            rotated: scored.rotated,
            slab_index: self.index,
        };
        self.pieces.push(PlacedPiece { piece, placement });
        placement
    }

    /// Puts the first piece of a fresh slab at the origin, unrotated when it
    /// fits that way. Returns the piece back when it fits neither way.
    pub fn place_first(&mut self, piece: Piece) -> Result<Placement, Piece> {
        let rect = piece.rect();
        let rotated = if rect.fits_in(&self.slab) {
            false
        } else if rect.rotated().fits_in(&self.slab) {
            true
        } else {
            return Err(piece);
        };
        let scored = ScoredPlacement {
            x: 0.0,
            y: 0.0,
            rotated,
            score: 0.0,
        };
        Ok(self.place(piece, scored))
    }

    pub fn into_instance(self) -> SlabInstance {
        let efficiency = self.efficiency();
        SlabInstance {
            width: self.slab.w,
            height: self.slab.h,
            pieces: self.pieces,
            efficiency,
        }
    }
}
