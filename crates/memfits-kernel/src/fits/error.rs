//! FITS synthesis error types.

use thiserror::Error;

/// Errors raised while turning a header and payload into a FITS image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FitsError {
    /// `BITPIX` is absent or zero, so the element width is unknown.
    #[error("header has no usable BITPIX (element width)")]
    MissingElementWidth,

    /// `BITPIX` names a width the format does not define.
    #[error("unsupported BITPIX value: {0}")]
    UnsupportedBitpix(i64),

    /// A card would not fit in 80 bytes, or the keyword is longer than 8.
    #[error("header card for {key:?} overflows: {len} bytes (limit {limit})")]
    ValueOverflow {
        key: String,
        len: usize,
        limit: usize,
    },

    /// Cards are restricted to printable ASCII.
    #[error("header card for {0:?} contains non-ASCII text")]
    NonAscii(String),

    /// NaN and infinities have no card representation.
    #[error("header card for {0:?} holds a non-finite float")]
    NonFinite(String),

    /// The payload was handed over with more than one dimension.
    #[error("payload must be flattened to one dimension, got shape {0:?}")]
    NotFlattened(Vec<usize>),

    /// The declared shape does not match the element count.
    #[error("payload shape declares {declared} elements but {actual} were supplied")]
    ShapeMismatch { declared: usize, actual: usize },

    /// Payload elements are not as wide as `BITPIX` says.
    #[error("payload elements are {element} bytes wide but BITPIX declares {declared}")]
    WidthMismatch { declared: usize, element: usize },
}

/// Result alias for FITS synthesis.
pub type FitsResult<T> = Result<T, FitsError>;
