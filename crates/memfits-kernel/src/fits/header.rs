//! FITS header model and header block builder.

use super::card::{encode_card, end_card, is_end_keyword};
use super::data::ElementKind;
use super::error::{FitsError, FitsResult};
use super::layout::{pad_to_block, CARD_LEN};

/// Keyword carrying the element bit-width.
pub const BITPIX: &str = "BITPIX";

/// A header value, tagged by how it renders on a card.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    /// Rendered as `T` or `F`.
    Logical(bool),
    /// Rendered in decimal.
    Integer(i64),
    /// Rendered with a decimal point or exponent.
    Float(f64),
    /// Rendered single-quoted.
    Text(String),
    /// Free text, rendered without a value indicator.
    Comment(String),
}

impl HeaderValue {
    /// Integer view of the value, if it is one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            HeaderValue::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<bool> for HeaderValue {
    fn from(b: bool) -> Self {
        HeaderValue::Logical(b)
    }
}

impl From<i64> for HeaderValue {
    fn from(i: i64) -> Self {
        HeaderValue::Integer(i)
    }
}

impl From<i32> for HeaderValue {
    fn from(i: i32) -> Self {
        HeaderValue::Integer(i64::from(i))
    }
}

impl From<f64> for HeaderValue {
    fn from(f: f64) -> Self {
        HeaderValue::Float(f)
    }
}

impl From<&str> for HeaderValue {
    fn from(s: &str) -> Self {
        HeaderValue::Text(s.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(s: String) -> Self {
        HeaderValue::Text(s)
    }
}

/// One keyword/value pair.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderField {
    pub key: String,
    pub value: HeaderValue,
}

impl HeaderField {
    pub fn new(key: impl Into<String>, value: impl Into<HeaderValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// A commentary record (`COMMENT`, `HISTORY`, ...).
    pub fn comment(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: HeaderValue::Comment(text.into()),
        }
    }
}

/// Ordered header fields. Record order on disk follows insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    fields: Vec<HeaderField>,
}

impl Header {
    /// Create an empty header.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<HeaderValue>) -> Self {
        self.push(key, value);
        self
    }

    /// Append a field.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<HeaderValue>) {
        self.fields.push(HeaderField::new(key, value));
    }

    /// Append a prepared field.
    pub fn push_field(&mut self, field: HeaderField) {
        self.fields.push(field);
    }

    /// All fields in record order.
    pub fn fields(&self) -> &[HeaderField] {
        &self.fields
    }

    /// First value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        self.fields.iter().find(|f| f.key == key).map(|f| &f.value)
    }

    /// The declared `BITPIX`, if present and integral.
    pub fn bitpix(&self) -> Option<i64> {
        self.get(BITPIX).and_then(HeaderValue::as_integer)
    }

    /// Element kind declared by `BITPIX`.
    pub fn element_kind(&self) -> FitsResult<ElementKind> {
        match self.bitpix() {
            None | Some(0) => Err(FitsError::MissingElementWidth),
            Some(bits) => ElementKind::from_bitpix(bits),
        }
    }

    /// Bytes per payload element, `|BITPIX| / 8`.
    pub fn byte_width(&self) -> FitsResult<usize> {
        Ok(self.element_kind()?.width())
    }

    /// Number of 80-byte records the header renders to, `END` included.
    pub fn card_count(&self) -> usize {
        self.encoded_fields().count() + 1
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Check that every field encodes to a single card without rendering
    /// the block.
    pub fn validate(&self) -> FitsResult<()> {
        for field in self.encoded_fields() {
            encode_card(&field.key, &field.value)?;
        }
        Ok(())
    }

    /// Fields that become key/value records. `END` is never one of them.
    fn encoded_fields(&self) -> impl Iterator<Item = &HeaderField> {
        self.fields.iter().filter(|f| !is_end_keyword(&f.key))
    }
}

impl FromIterator<HeaderField> for Header {
    fn from_iter<I: IntoIterator<Item = HeaderField>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Render the header section: one card per field, the `END` record, then
/// space padding to the block unit.
pub fn build_header_block(header: &Header) -> FitsResult<Vec<u8>> {
    let raw_len = header.card_count() * CARD_LEN;
    let mut block = Vec::with_capacity(pad_to_block(raw_len));

    for field in header.encoded_fields() {
        block.extend_from_slice(&encode_card(&field.key, &field.value)?);
    }
    block.extend_from_slice(&end_card());
    block.resize(pad_to_block(block.len()), b' ');

    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fits::layout::BLOCK_UNIT;

    fn minimal() -> Header {
        Header::new()
            .with("SIMPLE", true)
            .with("BITPIX", 32)
            .with("NAXIS", 0)
    }

    #[test]
    fn test_minimal_header_block() {
        let block = build_header_block(&minimal()).unwrap();
        assert_eq!(block.len(), BLOCK_UNIT);
        assert!(block.starts_with(b"SIMPLE  = T"));
        assert_eq!(&block[240..243], b"END");
        assert!(block[243..].iter().all(|&b| b == b' '));
    }

    #[test]
    fn test_trailing_end_not_duplicated() {
        let header = minimal().with("END", HeaderValue::Comment(String::new()));
        assert_eq!(header.card_count(), 4);

        let block = build_header_block(&header).unwrap();
        assert_eq!(&block[240..243], b"END");
        assert!(!block[320..].windows(3).any(|w| w == b"END"));
    }

    #[test]
    fn test_header_spanning_two_blocks() {
        let mut header = minimal();
        for i in 0..40 {
            header.push(format!("KEY{i}"), i);
        }
        // 43 cards + END = 44 * 80 = 3520 bytes
        let block = build_header_block(&header).unwrap();
        assert_eq!(block.len(), 2 * BLOCK_UNIT);
    }

    #[test]
    fn test_exactly_one_block_of_cards() {
        let mut header = minimal();
        for i in 0..32 {
            header.push(format!("KEY{i}"), i);
        }
        // 35 cards + END fill one block exactly
        assert_eq!(header.card_count(), 36);
        let block = build_header_block(&header).unwrap();
        assert_eq!(block.len(), BLOCK_UNIT);
    }

    #[test]
    fn test_deterministic() {
        let a = build_header_block(&minimal()).unwrap();
        let b = build_header_block(&minimal()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_overflow_propagates() {
        let header = minimal().with("OBJECT", "z".repeat(90));
        assert!(matches!(
            build_header_block(&header),
            Err(FitsError::ValueOverflow { .. })
        ));
    }

    #[test]
    fn test_validate_matches_rendering() {
        minimal().validate().unwrap();

        let long_key = minimal().with("TOOLONGKEY", 1);
        assert!(matches!(
            long_key.validate(),
            Err(FitsError::ValueOverflow { .. })
        ));
        assert!(build_header_block(&long_key).is_err());
    }

    #[test]
    fn test_byte_width() {
        assert_eq!(minimal().byte_width().unwrap(), 4);
        assert_eq!(Header::new().with("BITPIX", -64).byte_width().unwrap(), 8);
        assert_eq!(
            Header::new().byte_width(),
            Err(FitsError::MissingElementWidth)
        );
        assert_eq!(
            Header::new().with("BITPIX", 0).byte_width(),
            Err(FitsError::MissingElementWidth)
        );
        assert_eq!(
            Header::new().with("BITPIX", 12).byte_width(),
            Err(FitsError::UnsupportedBitpix(12))
        );
    }
}
