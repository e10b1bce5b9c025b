//! slab_optimizer - slab layout and pricing engine for stone fabrication quotes.
//!
//! Given the countertop and vanity pieces on a quote, a stone catalog and the
//! pricing settings, the engine works out how many raw slabs are needed,
//! where each piece is cut from, and what each product costs.
//!
//! # Example
//!
//! ```
//! use slab_optimizer::{Product, Settings, StoneVariant, run_quote};
//!
//! let catalog = vec![StoneVariant {
//!     stone_type: "Calacatta".into(),
//!     thickness: "3cm".into(),
//!     finish: "Polished".into(),
//!     slab_width: 126.0,
//!     slab_height: 63.0,
//!     slab_cost: 1200.0,
//!     fab_cost_per_sqft: 35.0,
//!     markup: 1.5,
//! }];
//! let products = vec![Product {
//!     stone: "Calacatta".into(),
//!     thickness: "3cm".into(),
//!     finish: "Polished".into(),
//!     width: 24.0,
//!     depth: 96.0,
//!     quantity: 2,
//!     ..Default::default()
//! }];
//!
//! let quote = run_quote(&products, &catalog, &Settings::default());
//! assert_eq!(quote.summary.total_slabs, 1.0);
//! ```

pub mod allocator;
pub mod config;
pub mod error;
pub mod packer;
pub mod placement;
pub mod quote;
pub mod render;
pub mod sizer;
pub mod types;

pub use allocator::apply_multi_product_optimization;
pub use config::{Settings, SettingsError};
pub use error::GroupError;
pub use packer::{PackingResults, optimize_multi_product_layout};
pub use quote::{Quote, QuoteRequest, QuoteSummary, run_quote};
pub use sizer::{max_pieces_per_slab, price_independently};
pub use types::{
    PackedGroup, Piece, PlacedPiece, Placement, PricingMode, Priority, Product, ProductResult,
    SlabInstance, StoneKey, StoneVariant,
};
