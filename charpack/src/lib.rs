//! Convert indexed images and LDtk levels into charsets, charmaps, sprites
//! and tiles for an 8-bit graphics chip.
//!
//! Blocks of pixels are packed into hires or multicolor bit patterns,
//! deduplicated in first-seen order and referenced from byte maps.

pub mod batch;
pub mod charmap;
pub mod color;
pub mod config;
pub mod dictionary;
pub mod emit;
pub mod error;
pub mod level;
pub mod mode;
pub mod pipeline;
pub mod raster;
pub mod report;
pub mod sprite;
pub mod tiles;
