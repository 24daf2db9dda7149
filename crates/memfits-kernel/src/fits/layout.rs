//! Block arithmetic for the FITS layout.
//!
//! Both sections of the file are padded to [`BLOCK_UNIT`]. The projected
//! sizes here are what `getattr` reports before any bytes are built, so
//! they must agree exactly with the block builders.

use super::data::Payload;
use super::error::FitsResult;
use super::header::Header;

/// Alignment unit for the header and data sections.
pub const BLOCK_UNIT: usize = 2880;

/// Width of one header record.
pub const CARD_LEN: usize = 80;

/// Width of the keyword field at the start of a record.
pub const KEYWORD_LEN: usize = 8;

/// Round `len` up to the next multiple of [`BLOCK_UNIT`].
pub fn pad_to_block(len: usize) -> usize {
    len.div_ceil(BLOCK_UNIT) * BLOCK_UNIT
}

/// Padding needed after a section spanning `start..end` of the file so
/// that the file ends on a block boundary.
///
/// Alignment is measured against the cumulative file offset. A section
/// that would otherwise be empty still gets one full block.
pub fn padding_after(start: usize, end: usize) -> usize {
    let mut target = pad_to_block(end);
    if target <= start {
        target = start + BLOCK_UNIT;
    }
    target - end
}

/// Projected section sizes of a synthesized image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageLayout {
    /// Header section length, including `END` and space padding.
    pub header_len: usize,
    /// Raw payload bytes before zero padding.
    pub data_raw_len: usize,
    /// Data section length, including zero padding.
    pub data_len: usize,
}

impl ImageLayout {
    /// Compute the layout without rendering anything.
    pub fn of(header: &Header, payload: &Payload) -> FitsResult<Self> {
        // A card that cannot render means there is no file to size
        header.validate()?;
        let header_len = pad_to_block(header.card_count() * CARD_LEN);
        let width = header.byte_width()?;
        let data_raw_len = payload.len() * width;
        let data_len = data_raw_len + padding_after(header_len, header_len + data_raw_len);
        Ok(Self {
            header_len,
            data_raw_len,
            data_len,
        })
    }

    /// Total file size.
    pub fn total_len(&self) -> usize {
        self.header_len + self.data_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_to_block() {
        assert_eq!(pad_to_block(0), 0);
        assert_eq!(pad_to_block(1), BLOCK_UNIT);
        assert_eq!(pad_to_block(BLOCK_UNIT), BLOCK_UNIT);
        assert_eq!(pad_to_block(BLOCK_UNIT + 1), 2 * BLOCK_UNIT);
    }

    #[test]
    fn test_padding_is_cumulative() {
        // 3000 data bytes after a one-block header end at 5880
        assert_eq!(padding_after(2880, 5880), 8640 - 5880);
        // exact fit needs no padding
        assert_eq!(padding_after(2880, 5760), 0);
        // empty data still occupies one block
        assert_eq!(padding_after(2880, 2880), BLOCK_UNIT);
    }
}
