//! JSON image manifests.
//!
//! A manifest is the simplest way to hand the mount an image without a
//! FITS parser: an ordered card list, an optional shape, and the flat
//! element values.
//!
//! ```json
//! {
//!   "header": [
//!     {"key": "SIMPLE", "value": true},
//!     {"key": "BITPIX", "value": 16},
//!     {"key": "NAXIS", "value": 1},
//!     {"key": "NAXIS1", "value": 3},
//!     {"key": "COMMENT", "value": {"comment": "three samples"}}
//!   ],
//!   "shape": [3],
//!   "data": [1, 2, 3]
//! }
//! ```
//!
//! Elements are converted to the type named by `BITPIX`.

use std::path::Path;

use memfits_kernel::fits::{ElementKind, FitsError, HeaderField, HeaderValue};
use memfits_kernel::{FitsImage, Header, Payload};
use serde::Deserialize;
use serde_json::{Number, Value};
use thiserror::Error;

/// Manifest loading errors.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("card {key}: unsupported value {value}")]
    BadCard { key: String, value: Value },
    #[error("data[{index}]: {value} does not fit BITPIX {bitpix}")]
    BadElement {
        index: usize,
        value: Number,
        bitpix: i64,
    },
    #[error(transparent)]
    Fits(#[from] FitsError),
}

#[derive(Debug, Deserialize)]
struct RawCard {
    key: String,
    #[serde(default)]
    value: Value,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    header: Vec<RawCard>,
    #[serde(default)]
    shape: Option<Vec<usize>>,
    #[serde(default)]
    data: Vec<Number>,
}

/// Read a manifest file into an image.
pub fn load(path: &Path) -> Result<FitsImage, ManifestError> {
    let text = std::fs::read_to_string(path)?;
    parse(&text)
}

/// Parse manifest JSON into an image.
pub fn parse(text: &str) -> Result<FitsImage, ManifestError> {
    let raw: RawManifest = serde_json::from_str(text)?;

    let header = raw
        .header
        .into_iter()
        .map(card_to_field)
        .collect::<Result<Header, _>>()?;

    let kind = header.element_kind()?;
    let payload = convert(kind, &raw.data)?;
    let shape = raw.shape.unwrap_or_else(|| vec![payload.len()]);
    let payload = payload.with_shape(&shape)?;

    Ok(FitsImage::new(header, payload))
}

fn card_to_field(card: RawCard) -> Result<HeaderField, ManifestError> {
    match header_value(&card.value) {
        Some(value) => Ok(HeaderField {
            key: card.key,
            value,
        }),
        None => Err(ManifestError::BadCard {
            key: card.key,
            value: card.value,
        }),
    }
}

/// JSON kinds map onto header kinds; `{"comment": ...}` and `null` are
/// commentary.
fn header_value(value: &Value) -> Option<HeaderValue> {
    match value {
        Value::Bool(b) => Some(HeaderValue::Logical(*b)),
        Value::Number(n) => n
            .as_i64()
            .map(HeaderValue::Integer)
            .or_else(|| n.as_f64().map(HeaderValue::Float)),
        Value::String(s) => Some(HeaderValue::Text(s.clone())),
        Value::Null => Some(HeaderValue::Comment(String::new())),
        Value::Object(map) if map.len() == 1 => map
            .get("comment")
            .and_then(Value::as_str)
            .map(|text| HeaderValue::Comment(text.to_string())),
        _ => None,
    }
}

macro_rules! integers {
    ($variant:ident, $ty:ty, $data:expr, $bitpix:expr) => {{
        let values = $data
            .iter()
            .enumerate()
            .map(|(index, n)| {
                n.as_i64()
                    .and_then(|i| <$ty>::try_from(i).ok())
                    .ok_or_else(|| ManifestError::BadElement {
                        index,
                        value: n.clone(),
                        bitpix: $bitpix,
                    })
            })
            .collect::<Result<Vec<$ty>, _>>()?;
        Payload::$variant(values)
    }};
}

fn convert(kind: ElementKind, data: &[Number]) -> Result<Payload, ManifestError> {
    let bitpix = kind.bitpix();
    let floats = || -> Result<Vec<f64>, ManifestError> {
        data.iter()
            .enumerate()
            .map(|(index, n)| {
                n.as_f64().ok_or_else(|| ManifestError::BadElement {
                    index,
                    value: n.clone(),
                    bitpix,
                })
            })
            .collect()
    };

    Ok(match kind {
        ElementKind::U8 => integers!(U8, u8, data, bitpix),
        ElementKind::I16 => integers!(I16, i16, data, bitpix),
        ElementKind::I32 => integers!(I32, i32, data, bitpix),
        ElementKind::I64 => integers!(I64, i64, data, bitpix),
        ElementKind::F32 => Payload::F32(floats()?.into_iter().map(|f| f as f32).collect()),
        ElementKind::F64 => Payload::F64(floats()?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAMP: &str = r#"{
        "header": [
            {"key": "SIMPLE", "value": true},
            {"key": "BITPIX", "value": 16},
            {"key": "NAXIS", "value": 1},
            {"key": "NAXIS1", "value": 3},
            {"key": "BSCALE", "value": 1.5},
            {"key": "OBJECT", "value": "ramp"},
            {"key": "COMMENT", "value": {"comment": "three samples"}}
        ],
        "shape": [3],
        "data": [1, -2, 3]
    }"#;

    #[test]
    fn test_parse_value_kinds() {
        let image = parse(RAMP).unwrap();
        let header = image.header();
        assert_eq!(header.get("SIMPLE"), Some(&HeaderValue::Logical(true)));
        assert_eq!(header.get("NAXIS1"), Some(&HeaderValue::Integer(3)));
        assert_eq!(header.get("BSCALE"), Some(&HeaderValue::Float(1.5)));
        assert_eq!(header.get("OBJECT"), Some(&HeaderValue::Text("ramp".into())));
        assert_eq!(
            header.get("COMMENT"),
            Some(&HeaderValue::Comment("three samples".into()))
        );
        assert_eq!(image.payload(), &Payload::I16(vec![1, -2, 3]));
    }

    #[test]
    fn test_shape_defaults_to_data_len() {
        let text = r#"{"header": [{"key": "BITPIX", "value": -64}], "data": [0.5, 2]}"#;
        let image = parse(text).unwrap();
        assert_eq!(image.payload(), &Payload::F64(vec![0.5, 2.0]));
    }

    #[test]
    fn test_multidimensional_shape_rejected() {
        let text = r#"{"header": [{"key": "BITPIX", "value": 8}], "shape": [2, 2], "data": [1, 2, 3, 4]}"#;
        assert!(matches!(
            parse(text),
            Err(ManifestError::Fits(FitsError::NotFlattened(_)))
        ));
    }

    #[test]
    fn test_element_out_of_range() {
        let text = r#"{"header": [{"key": "BITPIX", "value": 8}], "data": [1, 300]}"#;
        assert!(matches!(
            parse(text),
            Err(ManifestError::BadElement { index: 1, .. })
        ));

        let text = r#"{"header": [{"key": "BITPIX", "value": 32}], "data": [1.5]}"#;
        assert!(matches!(parse(text), Err(ManifestError::BadElement { index: 0, .. })));
    }

    #[test]
    fn test_missing_bitpix() {
        let text = r#"{"header": [{"key": "SIMPLE", "value": true}], "data": []}"#;
        assert!(matches!(
            parse(text),
            Err(ManifestError::Fits(FitsError::MissingElementWidth))
        ));
    }

    #[test]
    fn test_bad_card_value() {
        let text = r#"{"header": [{"key": "BITPIX", "value": [16]}]}"#;
        assert!(matches!(parse(text), Err(ManifestError::BadCard { .. })));
    }
}
