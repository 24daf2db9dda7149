//! A header and payload pair, rendered on demand.

use super::data::{build_data_block, Payload};
use super::error::FitsResult;
use super::header::{build_header_block, Header};
use super::layout::ImageLayout;

/// The in-memory source of the synthetic file.
///
/// Immutable once constructed; sessions share it behind an `Arc` and
/// render their own copy of the bytes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FitsImage {
    header: Header,
    payload: Payload,
}

impl FitsImage {
    pub fn new(header: Header, payload: Payload) -> Self {
        Self { header, payload }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Section sizes, computed without rendering.
    pub fn layout(&self) -> FitsResult<ImageLayout> {
        ImageLayout::of(&self.header, &self.payload)
    }

    /// Size of the rendered file, or `None` when the header cannot be
    /// rendered (missing or unsupported `BITPIX`).
    pub fn projected_size(&self) -> Option<u64> {
        self.layout().ok().map(|l| l.total_len() as u64)
    }

    /// Render the complete file: header section then data section.
    pub fn render(&self) -> FitsResult<Vec<u8>> {
        let byte_width = self.header.byte_width()?;
        let mut image = build_header_block(&self.header)?;
        let data = build_data_block(&self.payload, byte_width, image.len())?;
        image.extend_from_slice(&data);
        Ok(image)
    }
}
