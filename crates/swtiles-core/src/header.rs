//! File Header Types
//!
//! The header is global and immutable once an archive is written. It names
//! the payload encoding, the CRS every coordinate is expressed in, and the
//! axis-aligned bounds enclosing every non-empty tile across all levels.

use serde::{Deserialize, Serialize};

/// What the archive's payloads represent.
///
/// Purely descriptive; nothing in the container decodes differently based
/// on this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum DataType {
    Raster = 1,
    Terrain = 2,
    Other = 3,
}

impl TryFrom<u8> for DataType {
    type Error = crate::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(DataType::Raster),
            2 => Ok(DataType::Terrain),
            3 => Ok(DataType::Other),
            _ => Err(crate::Error::InvalidDataType(value)),
        }
    }
}

/// Encoding of the stored payloads.
///
/// Payload bytes are opaque to the container; this field only determines
/// the media type advertised to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ImageFormat {
    Webp = 1,
    Png = 2,
    Jpeg = 3,
    Avif = 4,
}

impl TryFrom<u8> for ImageFormat {
    type Error = crate::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ImageFormat::Webp),
            2 => Ok(ImageFormat::Png),
            3 => Ok(ImageFormat::Jpeg),
            4 => Ok(ImageFormat::Avif),
            _ => Err(crate::Error::InvalidImageFormat(value)),
        }
    }
}

impl ImageFormat {
    /// Media type served for tiles of this format.
    pub fn media_type(self) -> &'static str {
        match self {
            ImageFormat::Webp => "image/webp",
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Avif => "image/avif",
        }
    }

    /// Conventional file extension for tiles of this format.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Webp => "webp",
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Avif => "avif",
        }
    }

    /// Detect the format from a source file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "webp" => Some(ImageFormat::Webp),
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "avif" => Some(ImageFormat::Avif),
            _ => None,
        }
    }
}

/// Parsed file header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub data_type: DataType,
    pub image_format: ImageFormat,
    /// EPSG code of the CRS that `bounds_*` and every level origin are
    /// expressed in. Opaque to the container; all levels share it.
    pub crs_epsg: u32,
    pub bounds_min_e: f64,
    pub bounds_min_n: f64,
    pub bounds_max_e: f64,
    pub bounds_max_n: f64,
    /// Pixel edge length shared by every payload (tiles are square).
    /// Declarative; the container never decodes payloads to enforce it.
    pub tile_size_px: u16,
    pub num_levels: u8,
    /// Absolute offset of the level table, normally 256.
    pub level_table_offset: u64,
}
