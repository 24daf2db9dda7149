//! Header card encoding.
//!
//! A card is one 80-byte ASCII record:
//!
//! ```text
//! SIMPLE  = T
//! BITPIX  = 16
//! OBJECT  = 'M31'
//! COMMENT  free text, no value indicator
//! END
//! ```
//!
//! Bytes 1-8 hold the keyword, left-justified. Byte 9 is the `=` value
//! indicator unless the keyword is commentary (`COMMENT`, `HISTORY`,
//! blank), in which case the rest of the record is free text.

use super::error::{FitsError, FitsResult};
use super::header::HeaderValue;
use super::layout::{CARD_LEN, KEYWORD_LEN};

/// Keyword of the terminator record.
pub const END_KEYWORD: &str = "END";

/// Keywords whose records carry free text instead of a value.
const COMMENTARY_KEYWORDS: &[&str] = &["COMMENT", "HISTORY", ""];

/// Returns true for keywords rendered without the `=` indicator.
pub fn is_commentary_keyword(key: &str) -> bool {
    COMMENTARY_KEYWORDS.contains(&key.trim_end())
}

/// Returns true if `key` names the terminator record.
pub fn is_end_keyword(key: &str) -> bool {
    key.trim_end() == END_KEYWORD
}

/// Encode one key/value pair into an 80-byte card.
pub fn encode_card(key: &str, value: &HeaderValue) -> FitsResult<[u8; CARD_LEN]> {
    if !key.is_ascii() {
        return Err(FitsError::NonAscii(key.to_string()));
    }
    if key.len() > KEYWORD_LEN {
        return Err(FitsError::ValueOverflow {
            key: key.to_string(),
            len: key.len(),
            limit: KEYWORD_LEN,
        });
    }

    let line = if is_commentary_keyword(key) || matches!(value, HeaderValue::Comment(_)) {
        format!("{:<width$} {}", key, render_free_text(value), width = KEYWORD_LEN)
    } else {
        format!("{:<width$}= {}", key, render_value(key, value)?, width = KEYWORD_LEN)
    };

    if !line.is_ascii() {
        return Err(FitsError::NonAscii(key.to_string()));
    }
    pad_card(key, line.as_bytes())
}

/// The `END` record.
pub fn end_card() -> [u8; CARD_LEN] {
    let mut card = [b' '; CARD_LEN];
    card[..END_KEYWORD.len()].copy_from_slice(END_KEYWORD.as_bytes());
    card
}

fn pad_card(key: &str, bytes: &[u8]) -> FitsResult<[u8; CARD_LEN]> {
    if bytes.len() > CARD_LEN {
        return Err(FitsError::ValueOverflow {
            key: key.to_string(),
            len: bytes.len(),
            limit: CARD_LEN,
        });
    }
    let mut card = [b' '; CARD_LEN];
    card[..bytes.len()].copy_from_slice(bytes);
    Ok(card)
}

fn render_value(key: &str, value: &HeaderValue) -> FitsResult<String> {
    Ok(match value {
        HeaderValue::Logical(b) => logical(*b).to_string(),
        HeaderValue::Integer(i) => i.to_string(),
        HeaderValue::Float(f) => render_float(key, *f)?,
        HeaderValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
        HeaderValue::Comment(s) => s.clone(),
    })
}

fn render_free_text(value: &HeaderValue) -> String {
    match value {
        HeaderValue::Text(s) | HeaderValue::Comment(s) => s.clone(),
        HeaderValue::Logical(b) => logical(*b).to_string(),
        HeaderValue::Integer(i) => i.to_string(),
        HeaderValue::Float(f) => format!("{f:?}"),
    }
}

fn logical(b: bool) -> &'static str {
    if b { "T" } else { "F" }
}

/// Shortest round-trip form, always with a decimal point or exponent.
fn render_float(key: &str, f: f64) -> FitsResult<String> {
    if !f.is_finite() {
        return Err(FitsError::NonFinite(key.to_string()));
    }
    // Debug keeps the ".0" on integral values; FITS wants an upper-case E
    Ok(format!("{f:?}").replace('e', "E"))
}
