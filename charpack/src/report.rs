//! Structured JSON report and preview image.

use std::fs::File;
use std::path::Path;

use image::{GrayImage, Luma};
use serde::Serialize;

use crate::charmap::{Charmap, CHAR_SIZE};
use crate::color::PixelWidth;
use crate::config::EncodeOptions;
use crate::error::{AddressSpaceWarning, ConversionError};
use crate::level::EntityRecord;
use crate::sprite::Sprite;
use crate::tiles::TileLayer;

/// Grey level for each 1-bit code
const HIRES_LEVELS: [u8; 2] = [0x00, 0xff];
/// Grey level for each 2-bit code
const MULTICOLOR_LEVELS: [u8; 4] = [0x00, 0x55, 0xaa, 0xff];

/// Everything produced for one input
#[derive(Debug, Serialize)]
#[serde(tag = "workflow", rename_all = "lowercase")]
pub enum Report {
    Charset {
        source: String,
        options: EncodeOptions,
        columns: usize,
        rows: usize,
        /// Hex encoded characters
        charset: Vec<String>,
        charmap: Vec<usize>,
        colormap: String,
        warnings: Vec<AddressSpaceWarning>,
    },
    Sprites {
        source: String,
        options: EncodeOptions,
        sprites: Vec<SpriteReport>,
    },
    Level {
        source: String,
        options: EncodeOptions,
        layers: Vec<LayerReport>,
    },
}

#[derive(Debug, Serialize)]
pub struct SpriteReport {
    pub number: usize,
    pub x: u32,
    pub y: u32,
    pub multicolor: bool,
    pub color: u8,
    pub data: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LayerReport {
    Tiles {
        level: String,
        layer: String,
        columns: usize,
        rows: usize,
        tilemap: Vec<usize>,
        /// Hex encoded tiles: optimized character indices then attributes
        tiles: Vec<String>,
        charset_first_index: usize,
        charset: String,
        empty_slot: Option<usize>,
        warnings: Vec<AddressSpaceWarning>,
    },
    Entities {
        level: String,
        layer: String,
        entities: Vec<EntityRecord>,
    },
}

impl Report {
    pub fn charset(source: &str, options: &EncodeOptions, charmap: &Charmap) -> Self {
        Report::Charset {
            source: source.to_string(),
            options: options.clone(),
            columns: charmap.columns,
            rows: charmap.rows,
            charset: charmap.charset.iter().map(hex::encode).collect(),
            charmap: charmap.indices.iter().map(|&i| i + options.char_offset).collect(),
            colormap: hex::encode(&charmap.colors),
            warnings: charmap.warnings.clone(),
        }
    }

    pub fn sprites(source: &str, options: &EncodeOptions, sprites: &[Sprite]) -> Self {
        Report::Sprites {
            source: source.to_string(),
            options: options.clone(),
            sprites: sprites
                .iter()
                .map(|sprite| SpriteReport {
                    number: sprite.number,
                    x: sprite.x,
                    y: sprite.y,
                    multicolor: sprite.multicolor,
                    color: sprite.color,
                    data: hex::encode(sprite.bytes),
                })
                .collect(),
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<(), ConversionError> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

impl LayerReport {
    pub fn tiles(level: &str, layer_name: &str, layer: &TileLayer) -> Self {
        let size = layer.tile_size();
        let tiles = layer
            .tile_char_indices
            .chunks_exact(size)
            .zip(layer.tiles.iter())
            .map(|(chars, tile)| {
                let mut bytes = chars.to_vec();
                bytes.extend_from_slice(&tile[size..]);
                hex::encode(bytes)
            })
            .collect();

        LayerReport::Tiles {
            level: level.to_string(),
            layer: layer_name.to_string(),
            columns: layer.columns,
            rows: layer.rows,
            tilemap: layer.tilemap.clone(),
            tiles,
            charset_first_index: layer.charset.first_index,
            charset: hex::encode(&layer.charset.data),
            empty_slot: layer.charset.empty_slot,
            warnings: layer.warnings.clone(),
        }
    }
}

/// Re-render a charmap from its encoded characters as grey levels
pub fn render_preview(charmap: &Charmap) -> GrayImage {
    let mut img = GrayImage::new(charmap.columns as u32 * CHAR_SIZE, charmap.rows as u32 * CHAR_SIZE);

    for row in 0..charmap.rows {
        for column in 0..charmap.columns {
            let cell = row * charmap.columns + column;
            let glyph = charmap.charset.get(charmap.indices[cell]);

            for (y, &byte) in glyph.iter().enumerate() {
                for x in 0..CHAR_SIZE {
                    let level = match charmap.cell_widths[cell] {
                        PixelWidth::Hires => HIRES_LEVELS[((byte >> (7 - x)) & 1) as usize],
                        PixelWidth::Multicolor => {
                            MULTICOLOR_LEVELS[((byte >> (6 - 2 * (x / 2))) & 3) as usize]
                        }
                    };
                    img.put_pixel(
                        column as u32 * CHAR_SIZE + x,
                        row as u32 * CHAR_SIZE + y as u32,
                        Luma([level]),
                    );
                }
            }
        }
    }

    img
}

/// Write the preview of `charmap` as PNG
pub fn write_preview(path: &Path, charmap: &Charmap) -> Result<(), ConversionError> {
    render_preview(charmap).save(path)?;
    Ok(())
}
