//! LDtk project files.
//!
//! Only the parts needed for conversion are read: tile layers (cell position
//! and tileset source of each tile) and entity layers.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::charmap::CHAR_SIZE;
use crate::error::ConversionError;
use crate::tiles::TileGrid;

const LDTK_FILE_TYPE: &str = "LDtk Project JSON";

#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    #[serde(rename = "__header__")]
    header: Header,
    #[serde(default)]
    pub levels: Vec<Level>,
}

#[derive(Debug, Clone, Deserialize)]
struct Header {
    #[serde(rename = "fileType")]
    file_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Level {
    pub identifier: String,
    /// Absent when levels are stored in separate files
    #[serde(rename = "layerInstances")]
    pub layer_instances: Option<Vec<LayerInstance>>,
}

impl Level {
    pub fn layers(&self) -> &[LayerInstance] {
        self.layer_instances.as_deref().unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Tiles,
    Entities,
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LayerInstance {
    #[serde(rename = "__identifier")]
    pub identifier: String,
    #[serde(rename = "__type")]
    pub layer_type: String,
    /// Width in cells
    #[serde(rename = "__cWid")]
    pub columns: usize,
    /// Height in cells
    #[serde(rename = "__cHei")]
    pub rows: usize,
    /// Cell size in pixels
    #[serde(rename = "__gridSize")]
    pub grid_size: u32,
    #[serde(rename = "__tilesetRelPath")]
    pub tileset_rel_path: Option<String>,
    #[serde(rename = "gridTiles", default)]
    pub grid_tiles: Vec<GridTile>,
    #[serde(rename = "entityInstances", default)]
    pub entity_instances: Vec<EntityInstance>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GridTile {
    /// Position in the layer, in pixels
    pub px: [u32; 2],
    /// Top-left of the tile in the tileset image
    pub src: [u32; 2],
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntityInstance {
    #[serde(rename = "__identifier")]
    pub identifier: String,
    #[serde(rename = "__grid")]
    pub grid: [u32; 2],
    pub width: u32,
    #[serde(rename = "fieldInstances", default)]
    pub field_instances: Vec<FieldInstance>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldInstance {
    #[serde(rename = "__value")]
    pub value: serde_json::Value,
}

/// An entity as emitted, positions in grid cells
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityRecord {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub identifier: String,
    pub value: i64,
}

impl Project {
    pub fn open(path: &Path) -> Result<Self, ConversionError> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ConversionError> {
        let project: Project = serde_json::from_reader(reader)
            .map_err(|e| ConversionError::Format(format!("not an LDtk project: {}", e)))?;
        if project.header.file_type != LDTK_FILE_TYPE {
            return Err(ConversionError::Format(format!(
                "not an LDtk project: file type '{}'",
                project.header.file_type
            )));
        }
        Ok(project)
    }
}

impl LayerInstance {
    pub fn kind(&self) -> LayerKind {
        match self.layer_type.as_str() {
            "Tiles" => LayerKind::Tiles,
            "Entities" => LayerKind::Entities,
            _ => LayerKind::Other,
        }
    }

    /// Tile grid of the layer; cells are placed by position and the first
    /// tile of a stack wins. Empty cells leave the grid short.
    ///
    /// Tiles must be whole characters, so the grid size has to be a non-zero
    /// multiple of 8.
    pub fn tile_grid(&self) -> Result<TileGrid, ConversionError> {
        let grid_size = self.grid_size;
        if grid_size == 0 || grid_size % CHAR_SIZE != 0 {
            return Err(ConversionError::Format(format!(
                "layer '{}': grid size {} is not a multiple of {}",
                self.identifier, grid_size, CHAR_SIZE
            )));
        }

        let mut cells = vec![None; self.columns * self.rows];

        for tile in &self.grid_tiles {
            let column = (tile.px[0] / grid_size) as usize;
            let row = (tile.px[1] / grid_size) as usize;
            if column >= self.columns || row >= self.rows {
                continue;
            }
            let cell = &mut cells[row * self.columns + column];
            if cell.is_none() {
                *cell = Some((tile.src[0], tile.src[1]));
            }
        }

        Ok(TileGrid {
            columns: self.columns,
            rows: self.rows,
            tile_chars: (grid_size / CHAR_SIZE) as usize,
            sources: cells.into_iter().flatten().collect(),
        })
    }

    /// Entities ordered by ascending x
    pub fn entities(&self) -> Vec<EntityRecord> {
        let grid_size = self.grid_size.max(1);
        let mut records: Vec<EntityRecord> = self
            .entity_instances
            .iter()
            .map(|entity| EntityRecord {
                x: entity.grid[0],
                y: entity.grid[1],
                width: (entity.width / grid_size).max(1),
                identifier: entity.identifier.clone(),
                value: entity
                    .field_instances
                    .first()
                    .and_then(|field| field.value.as_i64())
                    .unwrap_or(0),
            })
            .collect();
        records.sort_by_key(|record| record.x);
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROJECT: &str = r#"{
        "__header__": { "fileType": "LDtk Project JSON", "app": "LDtk" },
        "levels": [
            {
                "identifier": "Level_0",
                "layerInstances": [
                    {
                        "__identifier": "Actors",
                        "__type": "Entities",
                        "__cWid": 4, "__cHei": 2, "__gridSize": 16,
                        "__tilesetRelPath": null,
                        "gridTiles": [],
                        "entityInstances": [
                            { "__identifier": "Door", "__grid": [3, 1], "width": 32,
                              "fieldInstances": [ { "__identifier": "to", "__value": 7 } ] },
                            { "__identifier": "Key", "__grid": [1, 0], "width": 8,
                              "fieldInstances": [] },
                            { "__identifier": "Bat", "__grid": [1, 1], "width": 16,
                              "fieldInstances": [ { "__value": "fast" } ] }
                        ]
                    },
                    {
                        "__identifier": "Walls",
                        "__type": "Tiles",
                        "__cWid": 2, "__cHei": 2, "__gridSize": 16,
                        "__tilesetRelPath": "walls.png",
                        "gridTiles": [
                            { "px": [16, 16], "src": [48, 0], "t": 3 },
                            { "px": [0, 0], "src": [0, 0], "t": 0 },
                            { "px": [0, 0], "src": [32, 0], "t": 2 },
                            { "px": [16, 0], "src": [16, 0], "t": 1 },
                            { "px": [0, 16], "src": [0, 16], "t": 4 }
                        ],
                        "entityInstances": []
                    },
                    {
                        "__identifier": "Collision",
                        "__type": "IntGrid",
                        "__cWid": 2, "__cHei": 2, "__gridSize": 16
                    }
                ]
            },
            { "identifier": "External", "layerInstances": null }
        ]
    }"#;

    #[test]
    fn reads_layers() {
        let project = Project::from_reader(PROJECT.as_bytes()).unwrap();
        assert_eq!(project.levels.len(), 2);
        assert!(project.levels[1].layers().is_empty());

        let kinds: Vec<LayerKind> = project.levels[0].layers().iter().map(|l| l.kind()).collect();
        assert_eq!(kinds, vec![LayerKind::Entities, LayerKind::Tiles, LayerKind::Other]);
    }

    #[test]
    fn tiles_are_placed_by_position() {
        let project = Project::from_reader(PROJECT.as_bytes()).unwrap();
        let grid = project.levels[0].layers()[1].tile_grid().unwrap();

        assert_eq!(grid.tile_chars, 2);
        assert_eq!(grid.sources, vec![(0, 0), (16, 0), (0, 16), (48, 0)]);
    }

    #[test]
    fn grid_size_must_cover_whole_characters() {
        let project = Project::from_reader(PROJECT.as_bytes()).unwrap();
        let mut layer = project.levels[0].layers()[1].clone();

        for grid_size in [0, 4, 12] {
            layer.grid_size = grid_size;
            assert!(matches!(layer.tile_grid(), Err(ConversionError::Format(_))));
        }
        layer.grid_size = 24;
        assert_eq!(layer.tile_grid().unwrap().tile_chars, 3);
    }

    #[test]
    fn entities_sorted_by_x() {
        let project = Project::from_reader(PROJECT.as_bytes()).unwrap();
        let entities = project.levels[0].layers()[0].entities();

        let summary: Vec<(&str, u32, u32, i64)> = entities
            .iter()
            .map(|e| (e.identifier.as_str(), e.x, e.width, e.value))
            .collect();
        assert_eq!(summary, vec![("Key", 1, 1, 0), ("Bat", 1, 1, 0), ("Door", 3, 2, 7)]);
    }

    #[test]
    fn rejects_other_json() {
        let err = Project::from_reader(r#"{ "__header__": { "fileType": "Tiled" } }"#.as_bytes())
            .unwrap_err();
        assert!(matches!(err, ConversionError::Format(_)));

        let err = Project::from_reader(r#"{ "levels": [] }"#.as_bytes()).unwrap_err();
        assert!(matches!(err, ConversionError::Format(_)));
    }
}
