//! Per-input conversion workflows.
//!
//! Every workflow fully converts its input before anything is emitted. Each
//! input, and each layer of a level, gets fresh dictionaries.

use std::path::Path;

use tracing::{debug, info};

use crate::charmap::{Charmap, CharmapBuilder};
use crate::config::EncodeOptions;
use crate::error::ConversionError;
use crate::level::{EntityRecord, LayerInstance, LayerKind, Project};
use crate::raster::IndexedImage;
use crate::sprite::{extract_sprites, Sprite};
use crate::tiles::{TileAssembler, TileLayer};

/// File name of `path`, used in comments and for file-name tags
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Build the charset and charmap of an indexed image
pub fn convert_charset(path: &Path, options: &EncodeOptions) -> Result<Charmap, ConversionError> {
    let image = IndexedImage::open(path)?;
    let charmap = CharmapBuilder::new(options).build(&image)?;
    info!(
        "{}: {} uniques in a {}x{} charmap",
        file_name(path),
        charmap.charset.len(),
        charmap.columns,
        charmap.rows
    );
    Ok(charmap)
}

/// Extract the non-blank sprites of a sprite sheet
pub fn convert_sprites(path: &Path, options: &EncodeOptions) -> Result<Vec<Sprite>, ConversionError> {
    let image = IndexedImage::open(path)?;
    let sprites = extract_sprites(&image, options);
    info!("{}: {} sprites", file_name(path), sprites.len());
    Ok(sprites)
}

/// Converted content of one layer
#[derive(Debug)]
pub enum LayerContent {
    Tiles { tileset: String, layer: TileLayer },
    Entities(Vec<EntityRecord>),
}

/// Outcome of one layer; a failing layer does not stop the others
#[derive(Debug)]
pub struct LevelLayer {
    pub level: String,
    pub layer: String,
    pub content: Result<LayerContent, ConversionError>,
}

/// Convert every tiles and entities layer of an LDtk project
pub fn convert_level(path: &Path, options: &EncodeOptions) -> Result<Vec<LevelLayer>, ConversionError> {
    let project = Project::open(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut layers = Vec::new();

    for level in &project.levels {
        for instance in level.layers() {
            let content = match instance.kind() {
                LayerKind::Tiles => {
                    let Some(rel_path) = instance.tileset_rel_path.as_deref() else {
                        debug!("layer '{}' has no tileset, skipped", instance.identifier);
                        continue;
                    };
                    convert_tile_layer(&base_dir.join(rel_path), &instance.identifier, instance, options)
                }
                LayerKind::Entities => Ok(LayerContent::Entities(instance.entities())),
                LayerKind::Other => continue,
            };

            layers.push(LevelLayer {
                level: level.identifier.clone(),
                layer: instance.identifier.clone(),
                content,
            });
        }
    }

    Ok(layers)
}

fn convert_tile_layer(
    tileset_path: &Path,
    layer_name: &str,
    instance: &LayerInstance,
    options: &EncodeOptions,
) -> Result<LayerContent, ConversionError> {
    let grid = instance.tile_grid()?;
    let tileset = file_name(tileset_path);

    // colour tags on the tileset apply; characters are always indexed from 0 here
    let charset_options = EncodeOptions {
        char_offset: 0,
        ..options.with_file_tags(&tileset)
    };
    let image = IndexedImage::open(tileset_path)?;
    let charmap = CharmapBuilder::new(&charset_options).build(&image)?;

    let layer = TileAssembler::new(&charmap, options.empty_slot, options.char_offset)
        .assemble(layer_name, &grid)?;
    info!(
        "layer '{}': {} tiles, {} chars from {} tileset chars",
        layer_name,
        layer.tiles.len(),
        layer.charset.len(),
        charmap.charset.len()
    );

    Ok(LayerContent::Tiles { tileset, layer })
}
