//! Payload model and data block builder.

use super::error::{FitsError, FitsResult};
use super::layout::padding_after;

/// Element types a primary array can hold, keyed by `BITPIX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    U8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl ElementKind {
    /// Map a `BITPIX` value to its element kind.
    pub fn from_bitpix(bitpix: i64) -> FitsResult<Self> {
        match bitpix {
            8 => Ok(ElementKind::U8),
            16 => Ok(ElementKind::I16),
            32 => Ok(ElementKind::I32),
            64 => Ok(ElementKind::I64),
            -32 => Ok(ElementKind::F32),
            -64 => Ok(ElementKind::F64),
            0 => Err(FitsError::MissingElementWidth),
            other => Err(FitsError::UnsupportedBitpix(other)),
        }
    }

    pub fn bitpix(self) -> i64 {
        match self {
            ElementKind::U8 => 8,
            ElementKind::I16 => 16,
            ElementKind::I32 => 32,
            ElementKind::I64 => 64,
            ElementKind::F32 => -32,
            ElementKind::F64 => -64,
        }
    }

    /// Bytes per element.
    pub fn width(self) -> usize {
        (self.bitpix().unsigned_abs() / 8) as usize
    }
}

/// A flat, typed primary array.
///
/// Multi-dimensional sources must be flattened by the reader before they
/// get here; [`Payload::with_shape`] enforces that.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    U8(Vec<u8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl Default for Payload {
    fn default() -> Self {
        Payload::U8(Vec::new())
    }
}

impl Payload {
    /// An empty payload of the given kind.
    pub fn empty(kind: ElementKind) -> Self {
        match kind {
            ElementKind::U8 => Payload::U8(Vec::new()),
            ElementKind::I16 => Payload::I16(Vec::new()),
            ElementKind::I32 => Payload::I32(Vec::new()),
            ElementKind::I64 => Payload::I64(Vec::new()),
            ElementKind::F32 => Payload::F32(Vec::new()),
            ElementKind::F64 => Payload::F64(Vec::new()),
        }
    }

    /// Check the payload against the shape the reader reported.
    ///
    /// Only one-dimensional shapes (or the empty shape of a dataless
    /// header) are accepted.
    pub fn with_shape(self, shape: &[usize]) -> FitsResult<Self> {
        if shape.len() > 1 {
            return Err(FitsError::NotFlattened(shape.to_vec()));
        }
        let declared = shape.first().copied().unwrap_or(0);
        if declared != self.len() {
            return Err(FitsError::ShapeMismatch {
                declared,
                actual: self.len(),
            });
        }
        Ok(self)
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            Payload::U8(_) => ElementKind::U8,
            Payload::I16(_) => ElementKind::I16,
            Payload::I32(_) => ElementKind::I32,
            Payload::I64(_) => ElementKind::I64,
            Payload::F32(_) => ElementKind::F32,
            Payload::F64(_) => ElementKind::F64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Payload::U8(v) => v.len(),
            Payload::I16(v) => v.len(),
            Payload::I32(v) => v.len(),
            Payload::I64(v) => v.len(),
            Payload::F32(v) => v.len(),
            Payload::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append every element big-endian.
    fn write_be(&self, out: &mut Vec<u8>) {
        macro_rules! put {
            ($values:expr) => {
                for v in $values {
                    out.extend_from_slice(&v.to_be_bytes());
                }
            };
        }
        match self {
            Payload::U8(v) => out.extend_from_slice(v),
            Payload::I16(v) => put!(v),
            Payload::I32(v) => put!(v),
            Payload::I64(v) => put!(v),
            Payload::F32(v) => put!(v),
            Payload::F64(v) => put!(v),
        }
    }
}

/// Render the data section.
///
/// `header_len` is the length of the header section already in front of
/// this block; zero padding is sized so the whole file ends on a block
/// boundary.
pub fn build_data_block(
    payload: &Payload,
    byte_width: usize,
    header_len: usize,
) -> FitsResult<Vec<u8>> {
    if byte_width == 0 {
        return Err(FitsError::MissingElementWidth);
    }
    let element = payload.kind().width();
    // an empty payload carries no elements to disagree with
    if element != byte_width && !payload.is_empty() {
        return Err(FitsError::WidthMismatch {
            declared: byte_width,
            element,
        });
    }

    let raw_len = payload.len() * byte_width;
    let pad = padding_after(header_len, header_len + raw_len);
    let mut block = Vec::with_capacity(raw_len + pad);
    payload.write_be(&mut block);
    block.resize(raw_len + pad, 0);

    Ok(block)
}
