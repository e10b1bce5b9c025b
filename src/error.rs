//! Per-group failure taxonomy.

use thiserror::Error;

use crate::types::StoneKey;

/// Why a stone group could not be packed. Failures stay local to their group.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GroupError {
    #[error("no catalog entry for {key}")]
    CatalogMiss { key: StoneKey },

    #[error(
        "piece '{piece}' ({width}x{depth}) does not fit a {slab_width}x{slab_height} slab in either orientation"
    )]
    UnplaceablePiece {
        piece: String,
        product_index: usize,
        width: f64,
        depth: f64,
        slab_width: f64,
        slab_height: f64,
    },

    #[error("internal packing fault: {message}")]
    Internal { message: String },
}

impl GroupError {
    /// Stable machine-readable tag.
    pub fn kind(&self) -> &'static str {
        match self {
            GroupError::CatalogMiss { .. } => "catalog_miss",
            GroupError::UnplaceablePiece { .. } => "unplaceable_piece",
            GroupError::Internal { .. } => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unplaceable_message_names_piece_and_slab() {
        let err = GroupError::UnplaceablePiece {
            piece: "Island".into(),
            product_index: 0,
            width: 130.0,
            depth: 70.0,
            slab_width: 126.0,
            slab_height: 63.0,
        };
        let msg = err.to_string();
        assert!(msg.contains("Island"));
        assert!(msg.contains("130x70"));
        assert!(msg.contains("126x63"));
        assert_eq!(err.kind(), "unplaceable_piece");
    }

    #[test]
    fn test_catalog_miss_message() {
        let err = GroupError::CatalogMiss {
            key: StoneKey::new("Onyx", "3cm", "Leathered"),
        };
        assert_eq!(err.to_string(), "no catalog entry for Onyx / 3cm / Leathered");
    }
}
