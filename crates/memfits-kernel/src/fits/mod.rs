//! FITS primary image synthesis.
//!
//! Turns an in-memory [`Header`] and flat [`Payload`] into the exact byte
//! image of a single-HDU FITS file:
//!
//! ```text
//! ┌───────────────────────────────┐  offset 0
//! │ 80-byte cards ... END         │
//! │ space padding                 │
//! ├───────────────────────────────┤  multiple of 2880
//! │ big-endian elements           │
//! │ zero padding                  │
//! └───────────────────────────────┘  multiple of 2880
//! ```

pub mod card;
pub mod data;
mod error;
pub mod header;
pub mod image;
pub mod layout;

pub use card::{encode_card, end_card};
pub use data::{build_data_block, ElementKind, Payload};
pub use error::{FitsError, FitsResult};
pub use header::{build_header_block, Header, HeaderField, HeaderValue};
pub use image::FitsImage;
pub use layout::{ImageLayout, BLOCK_UNIT, CARD_LEN};
