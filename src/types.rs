use serde::{Deserialize, Deserializer, Serialize};

use crate::config::{EPS, SQ_IN_PER_SQ_FT};

/// Axis-aligned rectangle in inches. `w` runs along the slab width, `h` along its height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(w: f64, h: f64) -> Self {
        Self { w, h }
    }

    pub fn area(&self) -> f64 {
        self.w * self.h
    }

    pub fn rotated(&self) -> Self {
        Self {
            w: self.h,
            h: self.w,
        }
    }

    pub fn fits_in(&self, other: &Rect) -> bool {
        self.w <= other.w + EPS && self.h <= other.h + EPS
    }

    pub fn is_square(&self) -> bool {
        (self.w - self.h).abs() < EPS
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.w, self.h)
    }
}

/// Packing order tier. Declaration order is packing order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Normal,
    Low,
}

impl Priority {
    /// Parses a form value; anything unrecognised is `Normal`.
    pub fn from_label(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Priority::High,
            "low" => Priority::Low,
            _ => Priority::Normal,
        }
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = Option::<String>::deserialize(deserializer)?;
        Ok(label.as_deref().map(Priority::from_label).unwrap_or_default())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

/// Reads a dimension given either as a JSON number or a numeric string.
/// Blank or unparsable values read as 0, which marks the product invalid.
pub fn deserialize_dimension<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<NumberOrString>::deserialize(deserializer)? {
        Some(NumberOrString::Number(n)) => n,
        Some(NumberOrString::Text(s)) => s.trim().parse().unwrap_or(0.0),
        None => 0.0,
    })
}

/// Reads a piece count given as a number or numeric string, truncating fractions.
pub fn deserialize_quantity<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match Option::<NumberOrString>::deserialize(deserializer)? {
        Some(NumberOrString::Number(n)) => n,
        Some(NumberOrString::Text(s)) => s.trim().parse().unwrap_or(0.0),
        None => 0.0,
    };
    if raw.is_finite() && raw >= 1.0 {
        Ok(raw.trunc().min(u32::MAX as f64) as u32)
    } else {
        Ok(0)
    }
}

/// Exact (stone type, thickness, finish) triple. Only slabs with the same key are interchangeable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct StoneKey {
    pub stone_type: String,
    pub thickness: String,
    pub finish: String,
}

impl StoneKey {
    pub fn new(
        stone_type: impl Into<String>,
        thickness: impl Into<String>,
        finish: impl Into<String>,
    ) -> Self {
        Self {
            stone_type: stone_type.into(),
            thickness: thickness.into(),
            finish: finish.into(),
        }
    }
}

impl std::fmt::Display for StoneKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / {} / {}", self.stone_type, self.thickness, self.finish)
    }
}

/// One product line on the quote form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Product {
    pub stone: String,
    #[serde(deserialize_with = "deserialize_dimension")]
    pub width: f64,
    #[serde(deserialize_with = "deserialize_dimension")]
    pub depth: f64,
    #[serde(deserialize_with = "deserialize_quantity")]
    pub quantity: u32,
    pub edge_detail: String,
    pub thickness: String,
    pub finish: String,
    /// Informational only; packing always uses the catalog slab size.
    pub slab_size: String,
    pub priority: Priority,
    pub custom_name: String,
    pub note: String,
}

impl Default for Product {
    fn default() -> Self {
        Self {
            stone: String::new(),
            width: 0.0,
            depth: 0.0,
            quantity: 1,
            edge_detail: String::new(),
            thickness: String::new(),
            finish: String::new(),
            slab_size: String::new(),
            priority: Priority::Normal,
            custom_name: String::new(),
            note: String::new(),
        }
    }
}

impl Product {
    pub fn key(&self) -> StoneKey {
        StoneKey::new(&self.stone, &self.thickness, &self.finish)
    }

    /// A product is packable when it names a stone and has positive, finite
    /// dimensions and quantity.
    pub fn is_valid(&self) -> bool {
        !self.stone.trim().is_empty()
            && self.width.is_finite()
            && self.width > 0.0
            && self.depth.is_finite()
            && self.depth > 0.0
            && self.quantity > 0
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.width, self.depth)
    }

    /// Finished stone area over all units, in square feet.
    pub fn usable_area_sqft(&self) -> f64 {
        self.rect().area() / SQ_IN_PER_SQ_FT * self.quantity as f64
    }

    pub fn display_name(&self, index: usize) -> String {
        if self.custom_name.trim().is_empty() {
            format!("Type {}", index + 1)
        } else {
            self.custom_name.clone()
        }
    }
}

fn default_markup() -> f64 {
    1.0
}

/// Catalog row for one stone type/thickness/finish combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoneVariant {
    #[serde(alias = "Stone Type")]
    pub stone_type: String,
    #[serde(alias = "Thickness")]
    pub thickness: String,
    #[serde(alias = "Finish")]
    pub finish: String,
    #[serde(alias = "Slab Width", deserialize_with = "deserialize_dimension")]
    pub slab_width: f64,
    #[serde(alias = "Slab Height", deserialize_with = "deserialize_dimension")]
    pub slab_height: f64,
    #[serde(alias = "Slab Cost", deserialize_with = "deserialize_dimension")]
    pub slab_cost: f64,
    #[serde(alias = "Fab Cost", deserialize_with = "deserialize_dimension")]
    pub fab_cost_per_sqft: f64,
    #[serde(
        alias = "Mark Up",
        default = "default_markup",
        deserialize_with = "deserialize_dimension"
    )]
    pub markup: f64,
}

impl StoneVariant {
    pub fn key(&self) -> StoneKey {
        StoneKey::new(&self.stone_type, &self.thickness, &self.finish)
    }

    pub fn slab(&self) -> Rect {
        Rect::new(self.slab_width, self.slab_height)
    }

    pub fn matches(&self, key: &StoneKey) -> bool {
        self.stone_type == key.stone_type
            && self.thickness == key.thickness
            && self.finish == key.finish
    }
}

/// Exact catalog lookup. Never widens the match to a different thickness or finish.
pub fn find_variant<'a>(catalog: &'a [StoneVariant], key: &StoneKey) -> Option<&'a StoneVariant> {
    catalog.iter().find(|v| v.matches(key))
}

/// One physical unit to cut, expanded from a product's quantity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Piece {
    /// Index of the originating product in the input list.
    pub product_index: usize,
    pub piece_index: u32,
    pub width: f64,
    pub depth: f64,
    pub name: String,
    pub edge_detail: String,
    pub priority: Priority,
}

impl Piece {
    pub fn rect(&self) -> Rect {
        Rect::new(self.width, self.depth)
    }

    pub fn area(&self) -> f64 {
        self.width * self.depth
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    /// Width and depth are swapped on the slab.
    pub rotated: bool,
    pub slab_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedPiece {
    #[serde(flatten)]
    pub piece: Piece,
    #[serde(flatten)]
    pub placement: Placement,
}

impl PlacedPiece {
    /// Footprint on the slab in the placed orientation.
    pub fn footprint(&self) -> Rect {
        let rect = self.piece.rect();
        if self.placement.rotated {
            rect.rotated()
        } else {
            rect
        }
    }
}

/// A raw slab opened during packing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlabInstance {
    pub width: f64,
    pub height: f64,
    pub pieces: Vec<PlacedPiece>,
    /// Occupied area over slab area, in percent.
    pub efficiency: f64,
}

impl SlabInstance {
    pub fn used_area(&self) -> f64 {
        self.pieces.iter().map(|p| p.footprint().area()).sum()
    }
}

/// Successful packing of one stone group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackedGroup {
    pub key: StoneKey,
    pub variant: StoneVariant,
    pub slabs: Vec<SlabInstance>,
    pub placed_pieces: Vec<PlacedPiece>,
    pub total_slabs: usize,
    pub average_efficiency: f64,
}

impl PackedGroup {
    pub fn total_placed_area(&self) -> f64 {
        self.placed_pieces.iter().map(|p| p.footprint().area()).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingMode {
    /// Sized and priced on its own slabs.
    Independent,
    /// Shares slabs with other products of the same stone group.
    SharedSlabs,
}

/// Pricing for one input product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductResult {
    pub mode: PricingMode,
    pub usable_area_sqft: f64,
    /// Whole slabs when independent, a fractional share when shared.
    pub slabs_needed: f64,
    pub efficiency: f64,
    pub material_cost: f64,
    pub fabrication_cost: f64,
    pub installation_cost: f64,
    /// Material + fabrication + installation, before markup.
    pub raw_cost: f64,
    pub final_price: f64,
    pub pieces_per_slab: u32,
    /// Share of the group's placed area; `None` when independent.
    pub area_ratio: Option<f64>,
}
