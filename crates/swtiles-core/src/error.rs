//! Error Types for the Format Layer
//!
//! Every failure the codec can produce. Decoding errors surface at
//! `decode_*` and abort the call with no side effects; encoding can only
//! fail where a value does not fit its packed field.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("invalid magic bytes")]
    BadMagic,

    #[error("unsupported format version: {0}")]
    UnsupportedVersion(u16),

    #[error("reserved header byte at offset {0} is not zero")]
    ReservedNotZero(usize),

    #[error("invalid data type code: {0}")]
    InvalidDataType(u8),

    #[error("invalid image format code: {0}")]
    InvalidImageFormat(u8),

    #[error("payload offset {0} does not fit in 40 bits")]
    OffsetOverflow(u64),

    #[error("payload length {0} does not fit in 24 bits")]
    LengthOverflow(u32),
}

pub type Result<T> = std::result::Result<T, Error>;
