//! Indexed-colour rasters.
//!
//! The encoder only needs a palette index per pixel, so PNG files are decoded
//! without any colour expansion.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::ConversionError;

/// Read-only source of palette indices
pub trait Raster {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// Palette index at `(x, y)`
    fn sample(&self, x: u32, y: u32) -> u8;
    /// Palette index marked transparent by the source, if any
    fn transparent_index(&self) -> Option<u8>;
}

/// Rectangle of pixels in a raster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Region {
            x,
            y,
            width,
            height,
        }
    }
}

/// Decoded image holding one palette index per pixel
#[derive(Debug, Clone)]
pub struct IndexedImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    transparent: Option<u8>,
}

impl IndexedImage {
    /// Create an image from row-major palette indices
    pub fn from_pixels(
        width: u32,
        height: u32,
        pixels: Vec<u8>,
        transparent: Option<u8>,
    ) -> Result<Self, ConversionError> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(ConversionError::Format(format!(
                "{}x{} image needs {} pixels, got {}",
                width,
                height,
                expected,
                pixels.len()
            )));
        }
        Ok(IndexedImage {
            width,
            height,
            pixels,
            transparent,
        })
    }

    /// Read an indexed PNG file
    pub fn open(path: &Path) -> Result<Self, ConversionError> {
        let file = File::open(path)?;
        Self::decode(BufReader::new(file))
    }

    /// Decode an indexed PNG stream
    pub fn decode<R: Read>(reader: R) -> Result<Self, ConversionError> {
        let mut decoder = png::Decoder::new(reader);
        decoder.set_transformations(png::Transformations::IDENTITY);
        let mut reader = decoder.read_info()?;

        let mut buffer = vec![0; reader.output_buffer_size()];
        let frame = reader.next_frame(&mut buffer)?;

        if frame.color_type != png::ColorType::Indexed {
            return Err(ConversionError::Format(format!(
                "image should have a palette, found {:?}",
                frame.color_type
            )));
        }

        let bit_depth = frame.bit_depth as usize;
        if !matches!(bit_depth, 1 | 2 | 4 | 8) {
            return Err(ConversionError::Format(format!(
                "unsupported palette bit depth {}",
                bit_depth
            )));
        }

        let pixels = unpack_rows(
            &buffer,
            frame.width as usize,
            frame.height as usize,
            frame.line_size,
            bit_depth,
        );

        // The first fully transparent palette entry acts as the transparent index
        let transparent = reader
            .info()
            .trns
            .as_ref()
            .and_then(|alpha| alpha.iter().position(|&a| a == 0))
            .map(|index| index as u8);

        Ok(IndexedImage {
            width: frame.width,
            height: frame.height,
            pixels,
            transparent,
        })
    }
}

/// Expand packed sub-byte samples to one byte per pixel
fn unpack_rows(
    buffer: &[u8],
    width: usize,
    height: usize,
    line_size: usize,
    bit_depth: usize,
) -> Vec<u8> {
    let mask = ((1u16 << bit_depth) - 1) as u8;
    let mut pixels = Vec::with_capacity(width * height);

    for row in buffer.chunks(line_size).take(height) {
        for x in 0..width {
            let bit = x * bit_depth;
            let shift = 8 - bit_depth - bit % 8;
            pixels.push((row[bit / 8] >> shift) & mask);
        }
    }

    pixels
}

impl Raster for IndexedImage {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn sample(&self, x: u32, y: u32) -> u8 {
        self.pixels[(y * self.width + x) as usize]
    }

    fn transparent_index(&self) -> Option<u8> {
        self.transparent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_png(color: png::ColorType, depth: png::BitDepth, data: &[u8], trns: Option<&[u8]>) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, 8, 2);
            encoder.set_color(color);
            encoder.set_depth(depth);
            if color == png::ColorType::Indexed {
                encoder.set_palette(vec![0u8; 3 * 16]);
            }
            if let Some(trns) = trns {
                encoder.set_trns(trns.to_vec());
            }
            let mut writer = encoder.write_header().unwrap();
            writer.write_image_data(data).unwrap();
        }
        out
    }

    #[test]
    fn decodes_packed_indices() {
        // 8x2 at 4 bits: two bytes hold four pixels per row
        let data = [
            0x01, 0x23, 0x45, 0x67, //
            0xfe, 0xdc, 0xba, 0x98,
        ];
        let png = encode_png(png::ColorType::Indexed, png::BitDepth::Four, &data, Some(&[255, 255, 0]));
        let image = IndexedImage::decode(png.as_slice()).unwrap();

        assert_eq!((image.width(), image.height()), (8, 2));
        assert_eq!(image.sample(0, 0), 0);
        assert_eq!(image.sample(7, 0), 7);
        assert_eq!(image.sample(0, 1), 15);
        assert_eq!(image.sample(7, 1), 8);
        assert_eq!(image.transparent_index(), Some(2));
    }

    #[test]
    fn pixel_count_must_match_dimensions() {
        let err = IndexedImage::from_pixels(8, 2, vec![0; 15], None).unwrap_err();
        assert!(matches!(err, ConversionError::Format(_)));
        assert!(IndexedImage::from_pixels(8, 2, vec![0; 16], Some(3)).is_ok());
    }

    #[test]
    fn rejects_images_without_palette() {
        let png = encode_png(png::ColorType::Grayscale, png::BitDepth::Eight, &[0u8; 16], None);
        let err = IndexedImage::decode(png.as_slice()).unwrap_err();
        assert!(matches!(err, ConversionError::Format(_)));
    }
}
