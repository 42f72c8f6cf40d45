//! Errors and warnings raised while converting a single input.

use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that abort the conversion of one input
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Format error: {0}")]
    Format(String),

    #[error("Capacity exceeded: more than {limit} unique {kind} is not supported")]
    Capacity { kind: &'static str, limit: usize },

    #[error("Incomplete level data in layer '{layer}': {populated} of {expected} cells populated")]
    IncompleteData {
        layer: String,
        populated: usize,
        expected: usize,
    },

    #[error("{failed} of {layers} layers failed")]
    LayersFailed { failed: usize, layers: usize },

    #[error("Failed to decode PNG: {0}")]
    PngError(#[from] png::DecodingError),

    #[error("Failed to write image: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// The offset-adjusted number of entries no longer fits in a byte index.
///
/// The output is still produced, it just cannot be addressed in full on the
/// target hardware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSpaceWarning {
    /// What overflowed, e.g. "charmap" or "tilemap"
    pub section: String,
    /// Number of unique entries
    pub uniques: usize,
    /// Offset added to every emitted index
    pub offset: usize,
}

/// Number of entries addressable by a byte index
pub const ADDRESS_SPACE: usize = 256;

impl AddressSpaceWarning {
    /// Returns a warning if `uniques + offset` does not fit in the address space
    pub fn check(section: &str, uniques: usize, offset: usize) -> Option<Self> {
        (uniques + offset > ADDRESS_SPACE).then(|| AddressSpaceWarning {
            section: section.to_string(),
            uniques,
            offset,
        })
    }

    /// Number of entries beyond the address space
    pub fn overflow(&self) -> usize {
        self.uniques + self.offset - ADDRESS_SPACE
    }
}

impl fmt::Display for AddressSpaceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} overflows with {} entries; use offset ${:02x} instead",
            self.section,
            self.overflow(),
            ADDRESS_SPACE.saturating_sub(self.uniques)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warning_only_past_address_space() {
        assert!(AddressSpaceWarning::check("charmap", 200, 56).is_none());

        let warning = AddressSpaceWarning::check("charmap", 200, 64).unwrap();
        assert_eq!(warning.overflow(), 8);
        assert_eq!(
            warning.to_string(),
            "charmap overflows with 8 entries; use offset $38 instead"
        );
    }
}
