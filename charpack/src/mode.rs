//! Per-block hires detection inside multicolor images.

use crate::raster::{Raster, Region};

/// Decide whether a block of a multicolor image should be encoded hires.
///
/// Pixels are scanned in horizontal pairs, the unit of a multicolor code. A
/// block qualifies when it uses at most one colour besides the background
/// and at least one pair mixes two different values, which multicolor could
/// not reproduce. Uniform blocks never qualify.
///
/// `background` is the block's configured background; when unbound the
/// first pixel of the block is used.
pub fn prefers_hires<R: Raster + ?Sized>(raster: &R, region: Region, background: Option<u8>) -> bool {
    let background = background.unwrap_or_else(|| raster.sample(region.x, region.y));
    let mut foreground = None;
    let mut pixels_differ = false;

    for y in region.y..region.y + region.height {
        for x in (region.x..region.x + region.width).step_by(2) {
            let left = raster.sample(x, y);
            let right = raster.sample(x + 1, y);

            for pixel in [left, right] {
                if pixel == background {
                    continue;
                }
                match foreground {
                    None => foreground = Some(pixel),
                    Some(color) if color != pixel => return false,
                    Some(_) => {}
                }
            }

            if left != right {
                pixels_differ = true;
            }
        }
    }

    pixels_differ
}
