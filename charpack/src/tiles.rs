//! Tile assembly on top of a charmap.
//!
//! A tile is a square group of characters. Its composite block holds the
//! charmap indices of the group followed by their attribute bytes, so two
//! tiles only merge when both planes match. After deduplication the
//! characters referenced by the tiles are packed into a dense, optimized
//! charset.

use tracing::debug;

use crate::charmap::{Charmap, CHAR_BYTES, CHAR_SIZE};
use crate::config::EmptySlotPolicy;
use crate::dictionary::BlockDictionary;
use crate::error::{AddressSpaceWarning, ConversionError, ADDRESS_SPACE};

/// Cells of a tile layer, each referencing a tile in the tileset image
#[derive(Debug, Clone)]
pub struct TileGrid {
    pub columns: usize,
    pub rows: usize,
    /// Tile width and height in characters
    pub tile_chars: usize,
    /// Top-left pixel of each cell's tile in the tileset image, row-major
    pub sources: Vec<(u32, u32)>,
}

/// Characters used by a tile layer, packed from `first_index` on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizedCharset {
    /// Index of the first character in `data`
    pub first_index: usize,
    /// Character bytes; slots without a character are zero
    pub data: Vec<u8>,
    /// Index the empty character was moved to, for the explicit-slot policy
    pub empty_slot: Option<usize>,
}

impl OptimizedCharset {
    pub fn len(&self) -> usize {
        self.data.len() / CHAR_BYTES
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Result of assembling one tile layer
#[derive(Debug, Clone)]
pub struct TileLayer {
    /// Unique composite tiles, with charmap indices
    pub tiles: BlockDictionary,
    /// Row-major tile indices
    pub tilemap: Vec<usize>,
    pub columns: usize,
    pub rows: usize,
    pub tile_chars: usize,
    /// Per tile, the optimized charset index of every character
    pub tile_char_indices: Vec<u8>,
    pub charset: OptimizedCharset,
    pub warnings: Vec<AddressSpaceWarning>,
}

impl TileLayer {
    /// Characters per tile
    pub fn tile_size(&self) -> usize {
        self.tile_chars * self.tile_chars
    }

    pub fn tilemap_bytes(&self) -> Vec<u8> {
        self.tilemap.iter().map(|&t| t as u8).collect()
    }

    /// Structure-of-arrays character planes: row `c` holds character `c` of
    /// every tile
    pub fn char_planes(&self) -> Vec<Vec<u8>> {
        let size = self.tile_size();
        (0..size)
            .map(|c| {
                self.tile_char_indices
                    .chunks_exact(size)
                    .map(|tile| tile[c])
                    .collect()
            })
            .collect()
    }

    /// Structure-of-arrays attribute planes, laid out like `char_planes`
    pub fn color_planes(&self) -> Vec<Vec<u8>> {
        let size = self.tile_size();
        (0..size)
            .map(|c| self.tiles.iter().map(|tile| tile[size + c]).collect())
            .collect()
    }
}

/// Deduplicates the tiles of a grid against a charmap
pub struct TileAssembler<'a> {
    charmap: &'a Charmap,
    policy: EmptySlotPolicy,
    char_offset: usize,
}

impl<'a> TileAssembler<'a> {
    pub fn new(charmap: &'a Charmap, policy: EmptySlotPolicy, char_offset: usize) -> Self {
        TileAssembler {
            charmap,
            policy,
            char_offset,
        }
    }

    pub fn assemble(&self, layer: &str, grid: &TileGrid) -> Result<TileLayer, ConversionError> {
        let cells = grid.columns * grid.rows;
        if grid.sources.len() < cells {
            return Err(ConversionError::IncompleteData {
                layer: layer.to_string(),
                populated: grid.sources.len(),
                expected: cells,
            });
        }
        if self.charmap.charset.len() > ADDRESS_SPACE {
            return Err(ConversionError::Capacity {
                kind: "characters addressable from a tile",
                limit: ADDRESS_SPACE,
            });
        }

        let size = grid.tile_chars * grid.tile_chars;
        let mut tiles = BlockDictionary::new("tiles", 2 * size, cells)?;
        let mut tilemap = Vec::with_capacity(cells);
        let mut block = vec![0u8; 2 * size];

        for &(x, y) in &grid.sources[..cells] {
            self.extract(x, y, grid.tile_chars, &mut block)?;
            tilemap.push(tiles.lookup_or_insert(&block)?);
        }
        debug!("layer '{}': {} cells, {} unique tiles", layer, cells, tiles.len());

        let positions = self.relocate(&tiles, size);
        let charset = self.optimized_charset(&positions);

        let mut tile_char_indices = Vec::with_capacity(tiles.len() * size);
        for tile in tiles.iter() {
            tile_char_indices.extend(
                tile[..size]
                    .iter()
                    .map(|&c| positions[c as usize].unwrap_or(0) as u8),
            );
        }

        let mut warnings = Vec::new();
        warnings.extend(AddressSpaceWarning::check("tilemap", tiles.len(), 0));
        let used = charset.first_index + charset.len();
        warnings.extend(AddressSpaceWarning::check(
            "tile charset",
            used - self.char_offset,
            self.char_offset,
        ));

        Ok(TileLayer {
            tiles,
            tilemap,
            columns: grid.columns,
            rows: grid.rows,
            tile_chars: grid.tile_chars,
            tile_char_indices,
            charset,
            warnings,
        })
    }

    /// Fill `block` with the composite of the tile whose top-left pixel is
    /// `(x, y)`
    fn extract(&self, x: u32, y: u32, tile_chars: usize, block: &mut [u8]) -> Result<(), ConversionError> {
        let column = (x / CHAR_SIZE) as usize;
        let row = (y / CHAR_SIZE) as usize;
        if column + tile_chars > self.charmap.columns || row + tile_chars > self.charmap.rows {
            return Err(ConversionError::Format(format!(
                "tile at ({}, {}) lies outside the {}x{} tileset",
                x,
                y,
                self.charmap.columns as u32 * CHAR_SIZE,
                self.charmap.rows as u32 * CHAR_SIZE
            )));
        }

        let size = tile_chars * tile_chars;
        for ty in 0..tile_chars {
            for tx in 0..tile_chars {
                let i = ty * tile_chars + tx;
                block[i] = self.charmap.index_at(column + tx, row + ty) as u8;
                block[size + i] = self.charmap.color_at(column + tx, row + ty);
            }
        }
        Ok(())
    }

    /// Assign each character used by a tile its optimized charset index, in
    /// first-seen order.
    fn relocate(&self, tiles: &BlockDictionary, size: usize) -> Vec<Option<usize>> {
        let mut positions = vec![None; self.charmap.charset.len()];
        let mut next = self.char_offset;

        let reserved = match self.policy {
            EmptySlotPolicy::Merge => {
                // character 0 always takes the first position
                if !positions.is_empty() {
                    positions[0] = Some(next);
                    next += 1;
                }
                None
            }
            EmptySlotPolicy::Explicit(slot) => Some(slot as usize),
        };
        let relocated = reserved.and(self.charmap.empty_char());

        for tile in tiles.iter() {
            for &c in &tile[..size] {
                let c = c as usize;
                if positions[c].is_some() {
                    continue;
                }
                if Some(c) == relocated {
                    positions[c] = reserved;
                    continue;
                }
                if Some(next) == reserved {
                    next += 1;
                }
                positions[c] = Some(next);
                next += 1;
            }
        }

        positions
    }

    fn optimized_charset(&self, positions: &[Option<usize>]) -> OptimizedCharset {
        let empty_slot = match self.policy {
            EmptySlotPolicy::Explicit(slot) => self
                .charmap
                .empty_char()
                .and_then(|e| positions[e])
                .filter(|&p| p == slot as usize),
            EmptySlotPolicy::Merge => None,
        };

        let first_index = self.char_offset;
        let end = positions
            .iter()
            .flatten()
            .filter(|&&p| Some(p) != empty_slot)
            .map(|&p| p + 1)
            .max()
            .unwrap_or(first_index);

        let mut data = vec![0u8; (end - first_index) * CHAR_BYTES];
        for (c, position) in positions.iter().enumerate() {
            match position {
                Some(p) if Some(*p) != empty_slot => {
                    let at = (p - first_index) * CHAR_BYTES;
                    data[at..at + CHAR_BYTES].copy_from_slice(self.charmap.charset.get(c));
                }
                _ => {}
            }
        }

        OptimizedCharset {
            first_index,
            data,
            empty_slot,
        }
    }
}
