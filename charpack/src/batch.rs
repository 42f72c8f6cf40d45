//! Runs a workflow over a list of inputs.
//!
//! A failing input is logged and counted, and the batch moves on to the next
//! one. File-name tags are applied per input on top of the shared options.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{error, warn};

use crate::config::EncodeOptions;
use crate::emit::AsmWriter;
use crate::error::ConversionError;
use crate::pipeline::{convert_charset, convert_level, convert_sprites, file_name, LayerContent};
use crate::report::{write_preview, LayerReport, Report};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workflow {
    Charset,
    Sprites,
    Level,
}

/// Directories for per-input side files, named after the input's stem
#[derive(Debug, Clone, Default)]
pub struct SideOutputs {
    pub json_dir: Option<PathBuf>,
    /// Charset workflow only
    pub preview_dir: Option<PathBuf>,
}

impl SideOutputs {
    fn path(dir: &Path, input: &Path, extension: &str) -> io::Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let stem = input.file_stem().unwrap_or(input.as_os_str());
        Ok(dir.join(stem).with_extension(extension))
    }
}

/// Convert and emit every input, returning the number of inputs that failed.
///
/// Only a failure to flush `writer` aborts the batch.
pub fn run_batch<W: Write>(
    workflow: Workflow,
    base: &EncodeOptions,
    inputs: &[PathBuf],
    side: &SideOutputs,
    writer: &mut AsmWriter<W>,
) -> Result<usize, ConversionError> {
    let mut failures = 0;

    for input in inputs {
        let options = base.with_file_tags(&file_name(input));
        let result = match workflow {
            Workflow::Charset => run_charset(input, &options, side, writer),
            Workflow::Sprites => run_sprites(input, &options, side, writer),
            Workflow::Level => run_level(input, &options, side, writer),
        };
        if let Err(e) = result {
            error!("{}: {}", input.display(), e);
            failures += 1;
        }
    }

    writer.flush()?;
    Ok(failures)
}

fn run_charset<W: Write>(
    input: &Path,
    options: &EncodeOptions,
    side: &SideOutputs,
    writer: &mut AsmWriter<W>,
) -> Result<(), ConversionError> {
    let source = file_name(input);
    let charmap = convert_charset(input, options)?;
    for warning in &charmap.warnings {
        warn!("{}: {}", source, warning);
    }

    writer.charmap(&source, &charmap, options)?;

    if let Some(dir) = &side.json_dir {
        Report::charset(&source, options, &charmap).write_json(&SideOutputs::path(dir, input, "json")?)?;
    }
    if let Some(dir) = &side.preview_dir {
        write_preview(&SideOutputs::path(dir, input, "png")?, &charmap)?;
    }
    Ok(())
}

fn run_sprites<W: Write>(
    input: &Path,
    options: &EncodeOptions,
    side: &SideOutputs,
    writer: &mut AsmWriter<W>,
) -> Result<(), ConversionError> {
    let source = file_name(input);
    let sprites = convert_sprites(input, options)?;
    writer.sprites(&source, &sprites)?;

    if let Some(dir) = &side.json_dir {
        Report::sprites(&source, options, &sprites).write_json(&SideOutputs::path(dir, input, "json")?)?;
    }
    Ok(())
}

/// Layers are independent: a failing layer is logged and the rest of the
/// level is still emitted, then the level reports how many layers failed.
fn run_level<W: Write>(
    input: &Path,
    options: &EncodeOptions,
    side: &SideOutputs,
    writer: &mut AsmWriter<W>,
) -> Result<(), ConversionError> {
    let source = file_name(input);
    let layers = convert_level(input, options)?;
    let total = layers.len();
    let mut reports = Vec::new();
    let mut failed = 0;

    writer.comment(format_args!("charpack '{}'", source))?;
    for layer in layers {
        match layer.content {
            Ok(LayerContent::Tiles { tileset, layer: tiles }) => {
                for warning in &tiles.warnings {
                    warn!("{} layer '{}': {}", source, layer.layer, warning);
                }
                writer.tile_layer(&layer.level, &layer.layer, &tileset, &tiles, options)?;
                reports.push(LayerReport::tiles(&layer.level, &layer.layer, &tiles));
            }
            Ok(LayerContent::Entities(entities)) => {
                writer.entities(&layer.level, &layer.layer, &entities)?;
                reports.push(LayerReport::Entities {
                    level: layer.level,
                    layer: layer.layer,
                    entities,
                });
            }
            Err(e) => {
                error!("{} level '{}' layer '{}': {}", source, layer.level, layer.layer, e);
                failed += 1;
            }
        }
    }

    if let Some(dir) = &side.json_dir {
        Report::Level {
            source,
            options: options.clone(),
            layers: reports,
        }
        .write_json(&SideOutputs::path(dir, input, "json")?)?;
    }

    if failed > 0 {
        return Err(ConversionError::LayersFailed { failed, layers: total });
    }
    Ok(())
}
