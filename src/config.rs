//! Pricing settings and engine constants.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Float tolerance for bound and separation checks, in inches.
pub const EPS: f64 = 1e-9;

/// Leftover strips narrower than this (inches) are considered unusable.
pub const SLIVER_THRESHOLD: f64 = 12.0;

/// Waste-score penalty for each unusable strip a placement leaves behind.
pub const SLIVER_PENALTY: f64 = 100.0;

/// Square inches per square foot.
pub const SQ_IN_PER_SQ_FT: f64 = 144.0;

pub const DEFAULT_KERF_WIDTH: f64 = 0.125;
pub const DEFAULT_BREAKAGE_BUFFER: f64 = 10.0;
pub const DEFAULT_INSTALLATION_RATE: f64 = 15.0;

#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("{field} must be a finite, non-negative number, got {value}")]
    InvalidValue { field: &'static str, value: f64 },
}

/// Quote settings as entered on the pricing form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub include_kerf: bool,
    /// Saw blade width in inches.
    pub kerf_width: f64,
    /// Extra material cost in percent, e.g. 10 for 10%.
    pub breakage_buffer: f64,
    pub include_fabrication: bool,
    pub include_installation: bool,
    /// Fixed installation rate per square foot of finished stone.
    pub installation_rate_per_sqft: f64,
    /// Pack different products onto shared slabs instead of sizing each alone.
    pub multi_product_optimization: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            include_kerf: true,
            kerf_width: DEFAULT_KERF_WIDTH,
            breakage_buffer: DEFAULT_BREAKAGE_BUFFER,
            include_fabrication: true,
            include_installation: false,
            installation_rate_per_sqft: DEFAULT_INSTALLATION_RATE,
            multi_product_optimization: true,
        }
    }
}

impl Settings {
    /// Kerf spacing actually applied between pieces.
    pub fn effective_kerf(&self) -> f64 {
        if self.include_kerf && self.kerf_width.is_finite() && self.kerf_width > 0.0 {
            self.kerf_width
        } else {
            0.0
        }
    }

    /// Multiplier applied to slab cost for breakage, e.g. 1.10 for a 10% buffer.
    pub fn breakage_factor(&self) -> f64 {
        1.0 + self.breakage_buffer / 100.0
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let checks = [
            ("kerf_width", self.kerf_width),
            ("breakage_buffer", self.breakage_buffer),
            ("installation_rate_per_sqft", self.installation_rate_per_sqft),
        ];
        for (field, value) in checks {
            if !value.is_finite() || value < 0.0 {
                return Err(SettingsError::InvalidValue { field, value });
            }
        }
        Ok(())
    }
}
