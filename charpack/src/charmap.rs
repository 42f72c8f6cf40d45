//! Charset and charmap construction.
//!
//! An image is cut into 8x8 characters in raster order. Each character is
//! encoded, deduplicated into the charset and recorded in the charmap
//! together with its attribute byte.

use tracing::debug;

use crate::color::{ColorRoles, ObjectKind, PixelEncoder, PixelWidth};
use crate::config::EncodeOptions;
use crate::dictionary::BlockDictionary;
use crate::error::{AddressSpaceWarning, ConversionError};
use crate::mode::prefers_hires;
use crate::raster::{Raster, Region};

/// Character size in pixels
pub const CHAR_SIZE: u32 = 8;
/// Encoded character size in bytes
pub const CHAR_BYTES: usize = 8;
/// Attribute bit marking a hires character inside a multicolor image
pub const HIRES_MARKER: u8 = 0x08;
/// Colour bits available to characters of a hires image
const HIRES_COLOR_MASK: u8 = 0x0f;
/// Colour bits available to characters of a multicolor image
const MULTICOLOR_COLOR_MASK: u8 = 0x07;

/// Deduplicated characters of an image and the maps referencing them
#[derive(Debug, Clone)]
pub struct Charmap {
    /// Unique characters; index 0 is the empty character when there is one
    pub charset: BlockDictionary,
    /// Map width in characters
    pub columns: usize,
    /// Map height in characters
    pub rows: usize,
    /// Row-major charset indices, without the character offset
    pub indices: Vec<usize>,
    /// Row-major attribute bytes
    pub colors: Vec<u8>,
    /// Width each cell was encoded with
    pub cell_widths: Vec<PixelWidth>,
    /// Global width of the image
    pub pixel_width: PixelWidth,
    pub warnings: Vec<AddressSpaceWarning>,
}

impl Charmap {
    pub fn index_at(&self, column: usize, row: usize) -> usize {
        self.indices[row * self.columns + column]
    }

    pub fn color_at(&self, column: usize, row: usize) -> u8 {
        self.colors[row * self.columns + column]
    }

    /// Charmap as emitted, with `offset` added to every index
    pub fn map_bytes(&self, offset: usize) -> Vec<u8> {
        self.indices.iter().map(|&i| (i + offset) as u8).collect()
    }

    /// Charset index of the empty character
    pub fn empty_char(&self) -> Option<usize> {
        self.charset.empty_index()
    }
}

/// Builds a `Charmap` from a raster
pub struct CharmapBuilder<'a> {
    options: &'a EncodeOptions,
}

impl<'a> CharmapBuilder<'a> {
    pub fn new(options: &'a EncodeOptions) -> Self {
        CharmapBuilder { options }
    }

    /// Encode every complete 8x8 cell of `raster`
    pub fn build<R: Raster + ?Sized>(&self, raster: &R) -> Result<Charmap, ConversionError> {
        let columns = (raster.width() / CHAR_SIZE) as usize;
        let rows = (raster.height() / CHAR_SIZE) as usize;
        let cells = columns * rows;
        let pixel_width = self.options.pixel_width();
        let capacity = self.options.max_uniques.unwrap_or(cells);

        let mut charset = BlockDictionary::new("characters", CHAR_BYTES, capacity)?;
        let mut indices = Vec::with_capacity(cells);
        let mut colors = Vec::with_capacity(cells);
        let mut cell_widths = Vec::with_capacity(cells);

        let defaults = ColorRoles::from_options(self.options, raster.transparent_index());

        for row in 0..rows as u32 {
            for column in 0..columns as u32 {
                let region = Region::new(column * CHAR_SIZE, row * CHAR_SIZE, CHAR_SIZE, CHAR_SIZE);

                let width = match pixel_width {
                    PixelWidth::Multicolor if prefers_hires(raster, region, defaults.background) => {
                        PixelWidth::Hires
                    }
                    width => width,
                };

                let encoder = PixelEncoder::new(width, ObjectKind::Character);
                let (block, roles) = encoder.encode(raster, region, defaults);

                indices.push(charset.lookup_or_insert(&block)?);
                colors.push(self.attribute(&roles, width));
                cell_widths.push(width);
            }
        }

        if let Some(empty) = charset.promote_empty_to_front(&mut indices) {
            debug!("moved empty character from index {} to 0", empty);
        }

        let warnings = AddressSpaceWarning::check("charmap", charset.len(), self.options.char_offset)
            .into_iter()
            .collect();

        Ok(Charmap {
            charset,
            columns,
            rows,
            indices,
            colors,
            cell_widths,
            pixel_width,
            warnings,
        })
    }

    /// Attribute byte for a cell encoded with `width`
    fn attribute(&self, roles: &ColorRoles, width: PixelWidth) -> u8 {
        let color = roles.color().unwrap_or(self.options.default_color);
        match (self.options.pixel_width(), width) {
            (PixelWidth::Hires, _) => color & HIRES_COLOR_MASK,
            (PixelWidth::Multicolor, PixelWidth::Multicolor) => color & MULTICOLOR_COLOR_MASK,
            (PixelWidth::Multicolor, PixelWidth::Hires) => (color & MULTICOLOR_COLOR_MASK) | HIRES_MARKER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::IndexedImage;

    fn image(width: u32, height: u32, pixel: impl Fn(u32, u32) -> u8) -> IndexedImage {
        let mut pixels = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.push(pixel(x, y));
            }
        }
        IndexedImage::from_pixels(width, height, pixels, None).unwrap()
    }

    fn hires(background: u8) -> EncodeOptions {
        EncodeOptions {
            background: Some(background),
            ..Default::default()
        }
    }

    #[test]
    fn checkerboard_with_uniform_phase_has_one_char() {
        let img = image(16, 16, |x, y| ((x + y) % 2) as u8);
        let charmap = CharmapBuilder::new(&hires(0)).build(&img).unwrap();

        assert_eq!(charmap.charset.len(), 1);
        assert_eq!(charmap.indices, vec![0; 4]);
        assert_eq!(charmap.charset.get(0), &[0x55, 0xaa, 0x55, 0xaa, 0x55, 0xaa, 0x55, 0xaa]);
    }

    #[test]
    fn checkerboard_with_varying_phase_has_four_chars() {
        // each block gets its own phase and stripe pattern
        let img = image(16, 16, |x, y| {
            let block = (x / 8) + 2 * (y / 8);
            match block {
                0 => ((x + y) % 2) as u8,
                1 => ((x + y + 1) % 2) as u8,
                2 => (y % 2) as u8,
                _ => (x % 2) as u8,
            }
        });
        let charmap = CharmapBuilder::new(&hires(0)).build(&img).unwrap();

        assert_eq!(charmap.charset.len(), 4);
        assert_eq!(charmap.indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn empty_char_is_promoted() {
        // first block solid, second block empty
        let img = image(16, 8, |x, _| if x < 8 { 1 } else { 0 });
        let charmap = CharmapBuilder::new(&hires(0)).build(&img).unwrap();

        assert_eq!(charmap.charset.get(0), &[0; 8]);
        assert_eq!(charmap.charset.get(1), &[0xff; 8]);
        assert_eq!(charmap.indices, vec![1, 0]);
        assert_eq!(charmap.empty_char(), Some(0));
    }

    #[test]
    fn offset_applies_to_emitted_map() {
        let img = image(16, 8, |x, _| if x < 8 { 1 } else { 0 });
        let options = EncodeOptions {
            char_offset: 0x40,
            ..hires(0)
        };
        let charmap = CharmapBuilder::new(&options).build(&img).unwrap();
        assert_eq!(charmap.map_bytes(options.char_offset), vec![0x41, 0x40]);
        assert!(charmap.warnings.is_empty());
    }

    #[test]
    fn address_space_overflow_is_a_warning() {
        // 4 distinct characters past an offset of 254
        let img = image(32, 8, |x, y| if x / 8 == y % 4 { 1 } else { 0 });
        let options = EncodeOptions {
            char_offset: 254,
            ..hires(0)
        };
        let charmap = CharmapBuilder::new(&options).build(&img).unwrap();
        assert_eq!(charmap.charset.len(), 4);
        assert_eq!(charmap.warnings.len(), 1);
        assert_eq!(charmap.warnings[0].overflow(), 2);
    }

    #[test]
    fn max_uniques_is_a_capacity_error() {
        let img = image(24, 8, |x, _| (x / 8) as u8);
        let options = EncodeOptions {
            max_uniques: Some(2),
            multicolor: Some((1, 2)),
            background: Some(0),
            ..Default::default()
        };
        let err = CharmapBuilder::new(&options).build(&img).unwrap_err();
        assert!(matches!(err, ConversionError::Capacity { limit: 2, .. }));
    }

    #[test]
    fn attributes_record_unique_color_and_mode() {
        // block 0: thin hires line in color 13, block 1: wide multicolor pixels in color 14
        let img = image(16, 8, |x, y| match (x / 8, y) {
            (0, 0) if x == 1 => 13,
            (1, _) if x % 8 < 2 => 14,
            _ => 0,
        });
        let options = EncodeOptions {
            background: Some(0),
            multicolor: Some((1, 2)),
            default_color: 9,
            ..Default::default()
        };
        let charmap = CharmapBuilder::new(&options).build(&img).unwrap();

        assert_eq!(charmap.cell_widths, vec![PixelWidth::Hires, PixelWidth::Multicolor]);
        assert_eq!(charmap.colors, vec![(13 & 0x07) | HIRES_MARKER, 14 & 0x07]);
        assert_eq!(charmap.charset.get(0)[0], 0b0100_0000);
        assert_eq!(charmap.charset.get(1)[0], 0b1100_0000);
    }

    #[test]
    fn unbound_unique_uses_default_color() {
        let img = image(8, 8, |_, _| 0);
        let options = EncodeOptions {
            default_color: 0x1b,
            ..hires(0)
        };
        let charmap = CharmapBuilder::new(&options).build(&img).unwrap();
        assert_eq!(charmap.colors, vec![0x0b]);
    }
}
