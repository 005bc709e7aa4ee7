/// Error types for scene parsing and image decoding
use thiserror::Error;

/// Fatal errors while parsing a scene file. Any of these aborts the parse.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FormatError {
    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("expected {expected}, found {found:?}")]
    UnexpectedToken { expected: &'static str, found: String },

    #[error("token {token:?} is not a number")]
    NumericParse { token: String },

    #[error("object record ended without a kids field")]
    MissingKids,

    #[error("token is not valid UTF-8")]
    InvalidUtf8,

    #[error("vertex index {index} out of range for {count} vertices")]
    VertexIndexOutOfRange { index: usize, count: usize },

    #[error("objects nested more than {limit} deep")]
    NestingTooDeep { limit: usize },
}

/// Local problems with a single surface. The parser drops the surface and
/// carries on; these never escape [`crate::ac::parse`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("polygon has fewer than three vertex references")]
    TooFewVertices,

    #[error("polygon face normal is degenerate")]
    Degenerate,

    #[error("polygon could not be triangulated")]
    Triangulation,

    #[error("unknown surface type in flags {0:#x}")]
    UnknownType(i64),
}

/// Errors while decoding an SGI image.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[error("unsupported storage mode {0}")]
    UnsupportedStorageMode(u8),

    #[error("image data truncated: needed {needed} bytes, have {len}")]
    Truncated { needed: usize, len: usize },

    #[error("image has zero width or height")]
    InvalidDimensions,

    #[error("unsupported channel count {0}")]
    UnsupportedChannels(u16),

    #[error("run-length data overflows row {row} of channel {channel}")]
    RowOverflow { row: usize, channel: usize },

    #[error("cannot allocate {bytes} bytes for decoded pixels")]
    TooLarge { bytes: usize },
}

pub type FormatResult<T> = Result<T, FormatError>;
