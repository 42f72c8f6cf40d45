//! Assembler text output.
//!
//! Bytes are written as rows of `$xx` literals behind the dialect's byte
//! directive; every section is introduced by a comment line.

use std::fmt::Display;
use std::io::{self, Write};

use itertools::Itertools;

use crate::charmap::{Charmap, CHAR_BYTES};
use crate::config::{AsmDialect, EncodeOptions};
use crate::level::EntityRecord;
use crate::sprite::Sprite;
use crate::tiles::TileLayer;

/// Bytes per row of sprite data
const SPRITE_WRAP: usize = 24;

pub struct AsmWriter<W: Write> {
    out: W,
    directive: &'static str,
}

impl<W: Write> AsmWriter<W> {
    pub fn new(out: W, dialect: AsmDialect) -> Self {
        AsmWriter {
            out,
            directive: dialect.directive(),
        }
    }

    pub fn comment(&mut self, text: impl Display) -> io::Result<()> {
        writeln!(self.out, "; {}", text)
    }

    /// Write `bytes` in rows of at most `wrap` values
    pub fn byte_rows(&mut self, bytes: &[u8], wrap: usize) -> io::Result<()> {
        for row in bytes.chunks(wrap.max(1)) {
            self.byte_row(row, None)?;
        }
        Ok(())
    }

    fn byte_row(&mut self, row: &[u8], comment: Option<&str>) -> io::Result<()> {
        let values = row.iter().map(|b| format!("${:02x}", b)).join(",");
        match comment {
            Some(comment) => writeln!(self.out, "{} {} ; {}", self.directive, values, comment),
            None => writeln!(self.out, "{} {}", self.directive, values),
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Charset, charmap and, when enabled, the colour map of one image
    pub fn charmap(&mut self, source: &str, charmap: &Charmap, options: &EncodeOptions) -> io::Result<()> {
        let (columns, rows) = (charmap.columns, charmap.rows);

        self.comment(format_args!("charpack '{}'", source))?;
        self.comment(format_args!(
            "charset {} bytes ({} uniques)",
            charmap.charset.as_bytes().len(),
            charmap.charset.len()
        ))?;
        if options.char_offset != 0 {
            self.comment(format_args!(
                "NOTE chars start at index {} (byteoffset {})",
                options.char_offset,
                options.char_offset * CHAR_BYTES
            ))?;
        }
        self.byte_rows(charmap.charset.as_bytes(), CHAR_BYTES)?;

        self.comment(format_args!("charmap {} bytes ({} x {})", columns * rows, columns, rows))?;
        self.byte_rows(&charmap.map_bytes(options.char_offset), columns)?;

        if options.attributes {
            self.comment(format_args!("colormap {} bytes ({} x {})", columns * rows, columns, rows))?;
            self.byte_rows(&charmap.colors, columns)?;
        }
        Ok(())
    }

    pub fn sprites(&mut self, source: &str, sprites: &[Sprite]) -> io::Result<()> {
        self.comment(format_args!("charpack '{}'", source))?;
        for sprite in sprites {
            let mode = if sprite.multicolor { "multicolor" } else { "hires" };
            self.comment(format_args!(
                "{} ({},{}) {} color {}",
                sprite.number, sprite.x, sprite.y, mode, sprite.color
            ))?;
            self.byte_rows(&sprite.bytes, SPRITE_WRAP)?;
        }
        Ok(())
    }

    /// Tilemap, tile planes and optimized charset of one tile layer
    pub fn tile_layer(
        &mut self,
        level: &str,
        layer_name: &str,
        tileset: &str,
        layer: &TileLayer,
        options: &EncodeOptions,
    ) -> io::Result<()> {
        let (columns, rows) = (layer.columns, layer.rows);
        let (tile_count, size) = (layer.tiles.len(), layer.tile_size());

        self.comment(format_args!(
            "level: '{}', layer '{}', tileset '{}'",
            level, layer_name, tileset
        ))?;
        self.comment(format_args!("tilemap {} bytes ({} x {})", columns * rows, columns, rows))?;
        self.byte_rows(&layer.tilemap_bytes(), columns)?;

        self.comment(format_args!(
            "tiles {} bytes {}x{} SoA {} x {} ({} uniques)",
            tile_count * size,
            layer.tile_chars,
            layer.tile_chars,
            tile_count,
            size,
            tile_count
        ))?;
        for plane in layer.char_planes() {
            self.byte_rows(&plane, tile_count)?;
        }

        if options.attributes {
            self.comment(format_args!("tile colors {} bytes SoA {} x {}", tile_count * size, tile_count, size))?;
            for plane in layer.color_planes() {
                self.byte_rows(&plane, tile_count)?;
            }
        }

        let charset = &layer.charset;
        self.comment(format_args!(
            "charset {} bytes ({} chars)",
            charset.data.len(),
            charset.len()
        ))?;
        if charset.first_index != 0 {
            self.comment(format_args!(
                "NOTE chars start at index {} (byteoffset {})",
                charset.first_index,
                charset.first_index * CHAR_BYTES
            ))?;
        }
        if let Some(slot) = charset.empty_slot {
            self.comment(format_args!(
                "NOTE empty char needs to be put at place {} (offset {})!",
                slot,
                slot * CHAR_BYTES
            ))?;
        }
        self.byte_rows(&charset.data, CHAR_BYTES)
    }

    /// One row per entity: x, y, width, value
    pub fn entities(&mut self, level: &str, layer_name: &str, entities: &[EntityRecord]) -> io::Result<()> {
        self.comment(format_args!("level: '{}', layer '{}'", level, layer_name))?;
        self.comment(format_args!("entities {} (x, y, width, value)", entities.len()))?;
        for entity in entities {
            let row = [entity.x as u8, entity.y as u8, entity.width as u8, entity.value as u8];
            self.byte_row(&row, Some(&entity.identifier))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(dialect: AsmDialect, f: impl FnOnce(&mut AsmWriter<Vec<u8>>) -> io::Result<()>) -> String {
        let mut writer = AsmWriter::new(Vec::new(), dialect);
        f(&mut writer).unwrap();
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn wraps_rows_and_terminates_partial_row() {
        let text = render(AsmDialect::Acme, |w| w.byte_rows(&[0, 1, 2, 0xab, 0xff], 2));
        assert_eq!(text, "!byte $00,$01\n!byte $02,$ab\n!byte $ff\n");
    }

    #[test]
    fn dialect_directive() {
        assert_eq!(render(AsmDialect::Kick, |w| w.byte_rows(&[1], 8)), ".byte $01\n");
        assert_eq!(render(AsmDialect::Dasm, |w| w.byte_rows(&[1], 8)), ".db $01\n");
    }

    #[test]
    fn entity_rows_carry_identifier() {
        let entities = vec![EntityRecord {
            x: 3,
            y: 1,
            width: 2,
            identifier: "Door".to_string(),
            value: 7,
        }];
        let text = render(AsmDialect::Acme, |w| w.entities("Level_0", "Actors", &entities));
        assert_eq!(
            text,
            "; level: 'Level_0', layer 'Actors'\n\
             ; entities 1 (x, y, width, value)\n\
             !byte $03,$01,$02,$07 ; Door\n"
        );
    }
}
