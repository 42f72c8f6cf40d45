//! Encoding options shared by every workflow.
//!
//! Options are layered: defaults, then an optional JSON file, then command
//! line flags, then tags embedded in the input file name.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::color::PixelWidth;
use crate::error::ConversionError;

/// Assembler syntax for the emitted byte rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AsmDialect {
    /// ACME `!byte`
    #[default]
    Acme,
    /// KickAssembler `.byte`
    Kick,
    /// DreamAss `.db`
    Dasm,
}

impl AsmDialect {
    pub fn directive(self) -> &'static str {
        match self {
            AsmDialect::Acme => "!byte",
            AsmDialect::Kick => ".byte",
            AsmDialect::Dasm => ".db",
        }
    }
}

/// Where the empty character ends up in an optimized tile charset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptySlotPolicy {
    /// Character 0 always takes the first position
    #[default]
    Merge,
    /// The empty character is mapped to this index and is not copied
    Explicit(u8),
}

/// Configuration for the encoding process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeOptions {
    /// Background colour, auto-learned when absent
    pub background: Option<u8>,
    /// Foreground colour, forces hires with inverted bit meaning
    pub foreground: Option<u8>,
    /// Multicolor pair (mc1, mc2), forces multicolor
    pub multicolor: Option<(u8, u8)>,
    /// Added to every emitted character index
    pub char_offset: usize,
    /// Placement of the empty character in optimized tile charsets
    pub empty_slot: EmptySlotPolicy,
    /// Y origin of the first sprite row in pixels
    pub sprite_y_offset: u32,
    /// Emit attribute planes
    pub attributes: bool,
    /// Attribute colour used when a block has no unique colour
    pub default_color: u8,
    /// Dictionary capacity, defaults to the number of blocks scanned
    pub max_uniques: Option<usize>,
    /// Assembler syntax
    pub dialect: AsmDialect,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        EncodeOptions {
            background: None,
            foreground: None,
            multicolor: None,
            char_offset: 0,
            empty_slot: EmptySlotPolicy::Merge,
            sprite_y_offset: 0,
            attributes: false,
            default_color: 0,
            max_uniques: None,
            dialect: AsmDialect::Acme,
        }
    }
}

impl EncodeOptions {
    /// Load options from a JSON file, missing fields keep their defaults
    pub fn from_json_file(path: &Path) -> Result<Self, ConversionError> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Defaults, overridden by the JSON file at `config`, overridden by `flags`
    pub fn layered(config: Option<&Path>, flags: &OptionFlags) -> Result<Self, ConversionError> {
        let mut options = match config {
            Some(path) => Self::from_json_file(path)?,
            None => Self::default(),
        };
        flags.apply(&mut options);
        Ok(options)
    }

    /// Global pixel width of an image encoded with these options
    pub fn pixel_width(&self) -> PixelWidth {
        if self.foreground.is_some() {
            PixelWidth::Hires
        } else if self.multicolor.is_some() {
            PixelWidth::Multicolor
        } else {
            PixelWidth::Hires
        }
    }

    /// Returns a copy with the settings embedded in `file_name` applied.
    ///
    /// Recognised tags (hex digits): `-bgX`, `-fgX`, `-mcXY`, `-chXX`,
    /// `-chXXYY` (offset and explicit empty slot) and `-syXX`.
    pub fn with_file_tags(&self, file_name: &str) -> Self {
        let mut options = self.clone();

        // -bg and -fg force hires unless -mc is also present
        if let Some(bg) = tag_value(file_name, "-bg", 1) {
            options.background = Some(bg as u8);
            options.multicolor = None;
        }
        if let Some(fg) = tag_value(file_name, "-fg", 1) {
            options.foreground = Some(fg as u8);
        }
        if let Some(mc) = tag_value(file_name, "-mc", 2) {
            options.multicolor = Some(((mc >> 4) as u8, (mc & 0x0f) as u8));
            options.foreground = None;
        }
        // -chXX is an offset, -chXXYY an offset and an explicit empty slot
        if let Some(digits) = hex_run(file_name, "-ch", 2) {
            if let Some(offset) = hex_byte(&digits[..2]) {
                options.char_offset = offset as usize;
            }
            if let Some(slot) = digits.get(2..4).and_then(hex_byte) {
                options.empty_slot = EmptySlotPolicy::Explicit(slot);
            }
        }
        if let Some(sy) = tag_value(file_name, "-sy", 2) {
            options.sprite_y_offset = sy;
        }

        options
    }
}

/// Hex digits after the first `tag` followed by at least `min` of them
fn hex_run<'a>(name: &'a str, tag: &str, min: usize) -> Option<&'a str> {
    name.match_indices(tag).find_map(|(pos, _)| {
        let rest = &name[pos + tag.len()..];
        let run = rest.find(|c: char| !c.is_ascii_hexdigit()).unwrap_or(rest.len());
        (run >= min).then(|| &rest[..run])
    })
}

/// Value of the first `digits` hex digits after `tag`
fn tag_value(name: &str, tag: &str, digits: usize) -> Option<u32> {
    hex_run(name, tag, digits).and_then(|run| u32::from_str_radix(&run[..digits], 16).ok())
}

fn hex_byte(digits: &str) -> Option<u8> {
    u8::from_str_radix(digits, 16).ok()
}

/// Parse a byte given as `$xx`, `0xXX` or decimal
pub fn parse_byte(value: &str) -> Result<u8, String> {
    let parsed = if let Some(hex) = value.strip_prefix('$') {
        u8::from_str_radix(hex, 16)
    } else if let Some(hex) = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        u8::from_str_radix(hex, 16)
    } else {
        value.parse::<u8>()
    };
    parsed.map_err(|e| format!("invalid byte value '{}': {}", value, e))
}

/// Command line overrides for `EncodeOptions`
#[derive(Debug, Clone, Default, clap::Args)]
pub struct OptionFlags {
    /// Background colour
    #[arg(long, value_parser = parse_byte)]
    pub bg: Option<u8>,

    /// Foreground colour, forces hires
    #[arg(long, value_parser = parse_byte)]
    pub fg: Option<u8>,

    /// Multicolor pair, forces multicolor
    #[arg(long, num_args = 2, value_names = ["MC1", "MC2"], value_parser = parse_byte)]
    pub mc: Option<Vec<u8>>,

    /// Offset added to every character index
    #[arg(long, value_parser = parse_byte)]
    pub offset: Option<u8>,

    /// Put the empty character at this index in tile charsets
    #[arg(long, value_parser = parse_byte)]
    pub empty_slot: Option<u8>,

    /// Y position of the first sprite row
    #[arg(long, value_parser = parse_byte)]
    pub sprite_y: Option<u8>,

    /// Emit attribute planes
    #[arg(long)]
    pub attributes: bool,

    /// Attribute colour for blocks without a unique colour
    #[arg(long, value_parser = parse_byte)]
    pub default_color: Option<u8>,

    /// Maximum number of unique blocks
    #[arg(long)]
    pub max_uniques: Option<usize>,

    /// Assembler syntax
    #[arg(long, value_enum)]
    pub dialect: Option<AsmDialect>,
}

impl OptionFlags {
    /// Overwrite every option that was given on the command line
    pub fn apply(&self, options: &mut EncodeOptions) {
        if let Some(bg) = self.bg {
            options.background = Some(bg);
        }
        if let Some(fg) = self.fg {
            options.foreground = Some(fg);
        }
        if let Some([mc1, mc2]) = self.mc.as_deref().and_then(|mc| <[u8; 2]>::try_from(mc).ok()) {
            options.multicolor = Some((mc1, mc2));
        }
        if let Some(offset) = self.offset {
            options.char_offset = offset as usize;
        }
        if let Some(slot) = self.empty_slot {
            options.empty_slot = EmptySlotPolicy::Explicit(slot);
        }
        if let Some(sprite_y) = self.sprite_y {
            options.sprite_y_offset = sprite_y as u32;
        }
        if self.attributes {
            options.attributes = true;
        }
        if let Some(color) = self.default_color {
            options.default_color = color;
        }
        if self.max_uniques.is_some() {
            options.max_uniques = self.max_uniques;
        }
        if let Some(dialect) = self.dialect {
            options.dialect = dialect;
        }
    }
}
