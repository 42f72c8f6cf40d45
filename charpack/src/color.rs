//! Colour roles and pixel packing.
//!
//! This module contains:
//! - `ColorRoles`, binding abstract colour roles to palette indices
//! - `PixelEncoder`, packing a region of pixels into bytes
//!
//! Roles are learned per block: a block starts from the configured roles and
//! binds every unbound role, in priority order, to the first pixel value that
//! does not match an already bound role.

use serde::{Deserialize, Serialize};

use crate::config::EncodeOptions;
use crate::raster::{Raster, Region};

/// Number of bits used per encoded pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelWidth {
    /// 1 bit per pixel
    Hires,
    /// 2 bits per pixel, each code covers two horizontal pixels
    Multicolor,
}

impl PixelWidth {
    pub fn bits(self) -> usize {
        match self {
            PixelWidth::Hires => 1,
            PixelWidth::Multicolor => 2,
        }
    }
}

/// Kind of object being encoded.
///
/// Multicolor sprites and characters disagree on which of `10` and `11`
/// means mc2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Character,
    Sprite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Background,
    Mc1,
    Mc2,
    Unique,
}

const HIRES_CODES: [(Role, u8); 2] = [(Role::Background, 0b0), (Role::Unique, 0b1)];
const CHAR_MC_CODES: [(Role, u8); 4] = [
    (Role::Background, 0b00),
    (Role::Mc1, 0b01),
    (Role::Mc2, 0b10),
    (Role::Unique, 0b11),
];
const SPRITE_MC_CODES: [(Role, u8); 4] = [
    (Role::Background, 0b00),
    (Role::Mc1, 0b01),
    (Role::Mc2, 0b11),
    (Role::Unique, 0b10),
];

/// Colour role bindings for one block
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColorRoles {
    pub background: Option<u8>,
    pub mc1: Option<u8>,
    pub mc2: Option<u8>,
    pub unique: Option<u8>,
    /// Hires override: this colour is `1`, anything else `0`
    pub foreground: Option<u8>,
}

impl ColorRoles {
    /// Roles at the start of a block.
    ///
    /// The background falls back to the image's transparent index when no
    /// background is configured.
    pub fn from_options(options: &EncodeOptions, transparent: Option<u8>) -> Self {
        let (mc1, mc2) = match options.multicolor {
            Some((mc1, mc2)) => (Some(mc1), Some(mc2)),
            None => (None, None),
        };
        ColorRoles {
            background: options.background.or(transparent),
            mc1,
            mc2,
            unique: None,
            foreground: options.foreground,
        }
    }

    /// Colour reported for the block's attribute
    pub fn color(&self) -> Option<u8> {
        self.foreground.or(self.unique)
    }

    fn role(&self, role: Role) -> Option<u8> {
        match role {
            Role::Background => self.background,
            Role::Mc1 => self.mc1,
            Role::Mc2 => self.mc2,
            Role::Unique => self.unique,
        }
    }

    fn bind(&mut self, role: Role, pixel: u8) {
        let slot = match role {
            Role::Background => &mut self.background,
            Role::Mc1 => &mut self.mc1,
            Role::Mc2 => &mut self.mc2,
            Role::Unique => &mut self.unique,
        };
        *slot = Some(pixel);
    }

    /// Map a pixel to its bit code, binding a role if needed.
    ///
    /// Once every role is bound, a pixel matching none of them gets the
    /// unique code; the first unique colour stays bound.
    pub fn resolve(&mut self, pixel: u8, width: PixelWidth, kind: ObjectKind) -> u8 {
        if width == PixelWidth::Hires {
            if let Some(foreground) = self.foreground {
                return u8::from(pixel == foreground);
            }
        }

        let codes: &[(Role, u8)] = match (width, kind) {
            (PixelWidth::Hires, _) => &HIRES_CODES,
            (PixelWidth::Multicolor, ObjectKind::Character) => &CHAR_MC_CODES,
            (PixelWidth::Multicolor, ObjectKind::Sprite) => &SPRITE_MC_CODES,
        };

        if let Some(&(_, code)) = codes.iter().find(|(role, _)| self.role(*role) == Some(pixel)) {
            return code;
        }
        if let Some(&(role, code)) = codes.iter().find(|(role, _)| self.role(*role).is_none()) {
            self.bind(role, pixel);
            return code;
        }
        codes[codes.len() - 1].1
    }
}

/// Packs the pixels of a region into bytes, most significant bits first
#[derive(Debug, Clone, Copy)]
pub struct PixelEncoder {
    pub width: PixelWidth,
    pub kind: ObjectKind,
}

impl PixelEncoder {
    pub fn new(width: PixelWidth, kind: ObjectKind) -> Self {
        PixelEncoder { width, kind }
    }

    /// Encode `region` starting from `roles`, returning the packed bytes and
    /// the roles as bound at the end of the block.
    ///
    /// Multicolor codes sample the left pixel of each pair. The region width
    /// times the bits per code must be a multiple of 8.
    pub fn encode<R: Raster + ?Sized>(
        &self,
        raster: &R,
        region: Region,
        mut roles: ColorRoles,
    ) -> (Vec<u8>, ColorRoles) {
        let bits = self.width.bits();
        let mut bytes = Vec::with_capacity((region.width * region.height) as usize / 8);
        let mut current = 0u8;
        let mut bit_count = 0;

        for y in region.y..region.y + region.height {
            for x in (region.x..region.x + region.width).step_by(bits) {
                let code = roles.resolve(raster.sample(x, y), self.width, self.kind);
                current = (current << bits) | code;
                bit_count += bits;
                if bit_count == 8 {
                    bytes.push(current);
                    current = 0;
                    bit_count = 0;
                }
            }
        }

        (bytes, roles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::IndexedImage;

    fn bound(background: u8, mc1: u8, mc2: u8) -> ColorRoles {
        ColorRoles {
            background: Some(background),
            mc1: Some(mc1),
            mc2: Some(mc2),
            ..Default::default()
        }
    }

    #[test]
    fn multicolor_codes_differ_between_sprites_and_chars() {
        let mut char_roles = bound(0, 1, 2);
        let mut sprite_roles = bound(0, 1, 2);

        assert_eq!(char_roles.resolve(2, PixelWidth::Multicolor, ObjectKind::Character), 0b10);
        assert_eq!(char_roles.resolve(7, PixelWidth::Multicolor, ObjectKind::Character), 0b11);
        assert_eq!(sprite_roles.resolve(2, PixelWidth::Multicolor, ObjectKind::Sprite), 0b11);
        assert_eq!(sprite_roles.resolve(7, PixelWidth::Multicolor, ObjectKind::Sprite), 0b10);
        assert_eq!(char_roles.unique, Some(7));
        assert_eq!(sprite_roles.unique, Some(7));
    }

    #[test]
    fn roles_bind_in_priority_order() {
        let mut roles = ColorRoles::default();
        let width = PixelWidth::Multicolor;
        let kind = ObjectKind::Character;

        assert_eq!(roles.resolve(6, width, kind), 0b00);
        assert_eq!(roles.resolve(9, width, kind), 0b01);
        assert_eq!(roles.resolve(6, width, kind), 0b00);
        assert_eq!(roles.resolve(3, width, kind), 0b10);
        assert_eq!(roles.resolve(4, width, kind), 0b11);
        assert_eq!(roles, ColorRoles {
            background: Some(6),
            mc1: Some(9),
            mc2: Some(3),
            unique: Some(4),
            foreground: None,
        });
    }

    #[test]
    fn first_unique_color_is_kept() {
        let mut roles = ColorRoles {
            background: Some(0),
            ..Default::default()
        };

        assert_eq!(roles.resolve(5, PixelWidth::Hires, ObjectKind::Character), 1);
        assert_eq!(roles.resolve(8, PixelWidth::Hires, ObjectKind::Character), 1);
        assert_eq!(roles.unique, Some(5));
    }

    #[test]
    fn foreground_inverts_hires_meaning() {
        let mut roles = ColorRoles {
            background: Some(3),
            foreground: Some(3),
            ..Default::default()
        };

        assert_eq!(roles.resolve(3, PixelWidth::Hires, ObjectKind::Character), 1);
        assert_eq!(roles.resolve(0, PixelWidth::Hires, ObjectKind::Character), 0);
        assert_eq!(roles.color(), Some(3));
        assert_eq!(roles.unique, None);
    }

    #[test]
    fn encodes_hires_rows_msb_first() {
        let mut pixels = vec![0u8; 64];
        pixels[0] = 1;
        pixels[7] = 1;
        pixels[8 + 3] = 1;
        let image = IndexedImage::from_pixels(8, 8, pixels, None).unwrap();
        let encoder = PixelEncoder::new(PixelWidth::Hires, ObjectKind::Character);
        let roles = ColorRoles {
            background: Some(0),
            ..Default::default()
        };

        let (bytes, roles) = encoder.encode(&image, Region::new(0, 0, 8, 8), roles);
        assert_eq!(bytes, vec![0x81, 0x10, 0, 0, 0, 0, 0, 0]);
        assert_eq!(roles.unique, Some(1));

        let (again, _) = encoder.encode(&image, Region::new(0, 0, 8, 8), ColorRoles {
            background: Some(0),
            ..Default::default()
        });
        assert_eq!(bytes, again);
    }

    #[test]
    fn encodes_multicolor_pairs() {
        // one row: bg, mc1, mc2, other as pixel pairs
        let mut pixels = vec![0u8; 64];
        pixels[..8].copy_from_slice(&[0, 0, 1, 1, 2, 2, 7, 7]);
        let image = IndexedImage::from_pixels(8, 8, pixels, None).unwrap();
        let encoder = PixelEncoder::new(PixelWidth::Multicolor, ObjectKind::Character);

        let (bytes, roles) = encoder.encode(&image, Region::new(0, 0, 8, 8), bound(0, 1, 2));
        assert_eq!(bytes[0], 0b00_01_10_11);
        assert!(bytes[1..].iter().all(|&b| b == 0));
        assert_eq!(roles.unique, Some(7));
    }
}
