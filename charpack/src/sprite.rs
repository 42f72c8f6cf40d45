//! Sprite extraction from a sprite sheet.

use crate::color::{ColorRoles, ObjectKind, PixelEncoder, PixelWidth};
use crate::config::EncodeOptions;
use crate::mode::prefers_hires;
use crate::raster::{Raster, Region};

pub const SPRITE_WIDTH: u32 = 24;
pub const SPRITE_HEIGHT: u32 = 21;
/// Bytes per sprite including the trailing attribute byte
pub const SPRITE_BYTES: usize = 64;
/// Index of the attribute byte following the pixel data
pub const ATTRIBUTE_BYTE: usize = 63;
/// Attribute bit marking a multicolor sprite
const MULTICOLOR_FLAG: u8 = 0x80;

/// A non-blank sprite cut from the sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sprite {
    /// Sequence number among non-blank sprites
    pub number: usize,
    pub x: u32,
    pub y: u32,
    pub bytes: [u8; SPRITE_BYTES],
    pub multicolor: bool,
    /// Unique colour, or the default colour when none was bound
    pub color: u8,
}

/// Cut the sheet into 24x21 cells starting at the configured y offset,
/// skipping cells that encode to all zero bits.
pub fn extract_sprites<R: Raster + ?Sized>(raster: &R, options: &EncodeOptions) -> Vec<Sprite> {
    let pixel_width = options.pixel_width();
    let defaults = ColorRoles::from_options(options, raster.transparent_index());
    let mut sprites = Vec::new();

    let mut y = options.sprite_y_offset;
    while y + SPRITE_HEIGHT <= raster.height() {
        let mut x = 0;
        while x + SPRITE_WIDTH <= raster.width() {
            let region = Region::new(x, y, SPRITE_WIDTH, SPRITE_HEIGHT);
            let width = match pixel_width {
                PixelWidth::Multicolor if prefers_hires(raster, region, defaults.background) => {
                    PixelWidth::Hires
                }
                width => width,
            };

            let encoder = PixelEncoder::new(width, ObjectKind::Sprite);
            let (pixels, roles) = encoder.encode(raster, region, defaults);

            if pixels.iter().any(|&b| b != 0) {
                let multicolor = width == PixelWidth::Multicolor;
                let color = roles.color().unwrap_or(options.default_color);

                let mut bytes = [0u8; SPRITE_BYTES];
                bytes[..pixels.len()].copy_from_slice(&pixels);
                if options.attributes {
                    bytes[ATTRIBUTE_BYTE] =
                        (color & 0x0f) | if multicolor { MULTICOLOR_FLAG } else { 0 };
                }

                sprites.push(Sprite {
                    number: sprites.len(),
                    x,
                    y,
                    bytes,
                    multicolor,
                    color,
                });
            }

            x += SPRITE_WIDTH;
        }
        y += SPRITE_HEIGHT;
    }

    sprites
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::IndexedImage;

    /// Two sprites wide, two high, with a marker in the bottom-right sprite only
    fn sheet(y_pad: u32, marker: &[(u32, u32, u8)]) -> IndexedImage {
        let (width, height) = (SPRITE_WIDTH * 2, SPRITE_HEIGHT * 2 + y_pad);
        let mut pixels = vec![0u8; (width * height) as usize];
        for &(x, y, c) in marker {
            pixels[((y + y_pad) * width + x) as usize] = c;
        }
        IndexedImage::from_pixels(width, height, pixels, Some(0)).unwrap()
    }

    #[test]
    fn blank_cells_are_skipped() {
        let img = sheet(0, &[(24, 21, 1)]);
        let sprites = extract_sprites(&img, &EncodeOptions::default());

        assert_eq!(sprites.len(), 1);
        let sprite = &sprites[0];
        assert_eq!((sprite.number, sprite.x, sprite.y), (0, 24, 21));
        assert_eq!(sprite.bytes[0], 0x80);
        assert_eq!(sprite.bytes[ATTRIBUTE_BYTE], 0);
        assert_eq!(sprite.color, 1);
        assert!(!sprite.multicolor);
    }

    #[test]
    fn y_offset_moves_the_grid() {
        let img = sheet(5, &[(0, 0, 1)]);
        let options = EncodeOptions {
            sprite_y_offset: 5,
            ..Default::default()
        };
        let sprites = extract_sprites(&img, &options);
        assert_eq!(sprites.len(), 1);
        assert_eq!((sprites[0].x, sprites[0].y), (0, 5));
    }

    #[test]
    fn multicolor_sprite_codes_and_attribute() {
        // wide pixels: mc2 then an unbound colour
        let img = sheet(0, &[(0, 0, 2), (1, 0, 2), (2, 0, 6), (3, 0, 6)]);
        let options = EncodeOptions {
            background: Some(0),
            multicolor: Some((1, 2)),
            attributes: true,
            ..Default::default()
        };
        let sprites = extract_sprites(&img, &options);

        assert_eq!(sprites.len(), 1);
        let sprite = &sprites[0];
        assert!(sprite.multicolor);
        assert_eq!(sprite.bytes[0], 0b11_10_00_00);
        assert_eq!(sprite.color, 6);
        assert_eq!(sprite.bytes[ATTRIBUTE_BYTE], 0x86);
    }
}
