//! Coordinate and overlay dataset types
//!
//! Input: `{ fields: { [name]: { pdfRect: [x1,y1,x2,y2], fieldType, ... } } }`
//! Output: `{ metadata: {...}, fields: { [name]: { position: {...}, ... } } }`

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::geometry::{CalibrationOffset, NativeRect, PixelRect};

/// Key holding the native rectangle in coordinate datasets
pub const PDF_RECT_KEY: &str = "pdfRect";

const FIELD_TYPE_KEY: &str = "fieldType";
const OPTIONS_KEY: &str = "options";

/// Kind of interactive control a field maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    #[serde(alias = "/Tx")]
    Text,
    #[serde(alias = "/Ch", alias = "combo", alias = "list")]
    Choice,
    #[serde(alias = "textarea")]
    Multiline,
    #[serde(alias = "/Btn", alias = "radio")]
    Checkbox,
    #[serde(other)]
    Unknown,
}

impl FieldKind {
    /// Checkbox-like controls export an "on" value instead of free text
    pub fn is_boolean_like(&self) -> bool {
        matches!(self, Self::Checkbox)
    }
}

/// Choice option: what the user sees and what gets stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ChoiceOptionRepr")]
#[serde(rename_all = "camelCase")]
pub struct ChoiceOption {
    pub display_value: String,
    pub export_value: String,
}

impl ChoiceOption {
    pub fn new(display_value: impl Into<String>, export_value: impl Into<String>) -> Self {
        Self {
            display_value: display_value.into(),
            export_value: export_value.into(),
        }
    }
}

/// Accepted encodings of a choice option in coordinate datasets
#[derive(Deserialize)]
#[serde(untagged)]
enum ChoiceOptionRepr {
    Pair(String, String),
    Object {
        #[serde(rename = "displayValue")]
        display_value: String,
        #[serde(rename = "exportValue")]
        export_value: String,
    },
    Single(String),
}

impl From<ChoiceOptionRepr> for ChoiceOption {
    fn from(repr: ChoiceOptionRepr) -> Self {
        match repr {
            ChoiceOptionRepr::Pair(display, export) => Self::new(display, export),
            ChoiceOptionRepr::Object {
                display_value,
                export_value,
            } => Self::new(display_value, export_value),
            ChoiceOptionRepr::Single(value) => Self::new(value.clone(), value),
        }
    }
}

/// Non-geometric attributes carried through extraction unchanged
///
/// Kept as the raw JSON object so every value, including `fieldType` and
/// `options`, is written back exactly as the dataset author wrote it. Typed
/// views are derived on demand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldAttributes {
    raw: Map<String, Value>,
}

impl FieldAttributes {
    pub fn new(raw: Map<String, Value>) -> Self {
        Self { raw }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.raw.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.raw.contains_key(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.raw
    }

    /// `fieldType` exactly as written
    pub fn field_type(&self) -> Option<&Value> {
        self.raw.get(FIELD_TYPE_KEY)
    }

    /// Control kind; absent means text, unrecognized or non-string means unknown
    pub fn kind(&self) -> FieldKind {
        match self.field_type() {
            None => FieldKind::default(),
            Some(value) => FieldKind::deserialize(value).unwrap_or(FieldKind::Unknown),
        }
    }

    /// Choice options, `None` when absent or malformed
    pub fn options(&self) -> Option<Vec<ChoiceOption>> {
        self.raw
            .get(OPTIONS_KEY)
            .and_then(|value| Vec::<ChoiceOption>::deserialize(value).ok())
    }
}

/// One field of a coordinate dataset, validated
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCoordinate {
    pub name: String,
    pub native_rect: NativeRect,
    pub attributes: FieldAttributes,
}

impl FieldCoordinate {
    pub fn kind(&self) -> FieldKind {
        self.attributes.kind()
    }

    /// Parse a raw dataset entry. `Err` carries the reason the entry has no
    /// usable rectangle.
    pub fn from_entry(name: &str, entry: &Value) -> Result<Self, String> {
        let object = entry
            .as_object()
            .ok_or_else(|| "entry is not an object".to_string())?;

        let raw_rect = object
            .get(PDF_RECT_KEY)
            .and_then(Value::as_array)
            .ok_or_else(|| format!("missing {} array", PDF_RECT_KEY))?;

        let coords = raw_rect
            .iter()
            .map(Value::as_f64)
            .collect::<Option<Vec<f64>>>()
            .ok_or_else(|| format!("{} contains non-numeric values", PDF_RECT_KEY))?;

        let native_rect = NativeRect::from_slice(&coords).map_err(|e| e.to_string())?;

        // Attributes never decide whether a field gets a position
        let mut raw = object.clone();
        raw.remove(PDF_RECT_KEY);

        Ok(Self {
            name: name.to_string(),
            native_rect,
            attributes: FieldAttributes::new(raw),
        })
    }
}

/// Input dataset: raw entries are kept so pass-through is lossless
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoordinateDataset {
    pub fields: BTreeMap<String, Value>,
}

impl CoordinateDataset {
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Validated view of one field
    pub fn field(&self, name: &str) -> Option<Result<FieldCoordinate, String>> {
        self.fields
            .get(name)
            .map(|entry| FieldCoordinate::from_entry(name, entry))
    }
}

/// Output entry carrying a pixel-space position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayField {
    pub position: PixelRect,
    #[serde(flatten)]
    pub attributes: FieldAttributes,
}

/// Output entry: either transformed, or carried over untouched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OverlayEntry {
    Positioned(OverlayField),
    PassThrough(Value),
}

impl OverlayEntry {
    pub fn position(&self) -> Option<&PixelRect> {
        match self {
            Self::Positioned(field) => Some(&field.position),
            Self::PassThrough(_) => None,
        }
    }
}

/// Calibration audit trail written alongside the overlay positions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OverlayMetadata {
    pub scale: f64,
    pub dpi: f64,
    #[serde(rename = "pageHeightPt")]
    pub page_height_pt: f64,
    pub points_to_pixels: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub manual_correction: CalibrationOffset,
    pub reference_field: String,
    pub calculated_position: PixelRect,
    pub reference_position: PixelRect,
    pub field_count: usize,
    pub pass_through_fields: Vec<String>,
    pub degenerate_fields: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl OverlayMetadata {
    pub fn offset(&self) -> CalibrationOffset {
        CalibrationOffset::new(self.offset_x, self.offset_y)
    }
}

/// Overlay-position dataset consumed at presentation time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverlayDataset {
    pub metadata: OverlayMetadata,
    pub fields: BTreeMap<String, OverlayEntry>,
}

impl OverlayDataset {
    pub fn position(&self, name: &str) -> Option<&PixelRect> {
        self.fields.get(name).and_then(OverlayEntry::position)
    }

    /// Positioned fields only, in name order
    pub fn positioned(&self) -> impl Iterator<Item = (&String, &OverlayField)> {
        self.fields.iter().filter_map(|(name, entry)| match entry {
            OverlayEntry::Positioned(field) => Some((name, field)),
            OverlayEntry::PassThrough(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_coordinate_from_entry() {
        let entry = json!({
            "pdfRect": [101.49, 595.28, 143.99, 630.28],
            "fieldType": "text",
            "page": 0
        });
        let field = FieldCoordinate::from_entry("STR", &entry).unwrap();
        assert_eq!(field.name, "STR");
        assert_eq!(field.kind(), FieldKind::Text);
        assert_eq!(field.native_rect.left(), 101.49);
        assert!(!field.attributes.contains_key(PDF_RECT_KEY));
        assert_eq!(field.attributes.get("page"), Some(&json!(0)));
    }

    #[test]
    fn test_malformed_attributes_keep_rect() {
        let entry = json!({
            "pdfRect": [10, 10, 50, 20],
            "fieldType": 7,
            "options": [1, 2, 3]
        });
        let field = FieldCoordinate::from_entry("Lvl", &entry).unwrap();
        assert_eq!(field.native_rect.as_array(), [10.0, 10.0, 50.0, 20.0]);
        assert_eq!(field.kind(), FieldKind::Unknown);
        assert_eq!(field.attributes.options(), None);
        assert_eq!(field.attributes.get("options"), Some(&json!([1, 2, 3])));
    }

    #[test]
    fn test_attributes_preserve_field_type_verbatim() {
        let attributes: FieldAttributes = serde_json::from_value(json!({
            "fieldType": "/Btn",
            "options": [["Lawful Good", "LG"]]
        }))
        .unwrap();
        assert_eq!(attributes.kind(), FieldKind::Checkbox);
        assert_eq!(
            attributes.options(),
            Some(vec![ChoiceOption::new("Lawful Good", "LG")])
        );
        assert_eq!(
            serde_json::to_value(&attributes).unwrap(),
            json!({ "fieldType": "/Btn", "options": [["Lawful Good", "LG"]] })
        );
        assert_eq!(FieldAttributes::default().kind(), FieldKind::Text);
    }

    #[test]
    fn test_field_coordinate_rejects_bad_rects() {
        assert!(FieldCoordinate::from_entry("a", &json!({ "fieldType": "text" })).is_err());
        assert!(FieldCoordinate::from_entry("a", &json!({ "pdfRect": [1, 2, 3] })).is_err());
        assert!(FieldCoordinate::from_entry("a", &json!({ "pdfRect": [1, "2", 3, 4] })).is_err());
        assert!(FieldCoordinate::from_entry("a", &json!("nope")).is_err());
    }

    #[test]
    fn test_field_kind_aliases() {
        let kinds: Vec<FieldKind> =
            serde_json::from_value(json!(["/Tx", "choice", "textarea", "/Btn", "signature"]))
                .unwrap();
        assert_eq!(
            kinds,
            vec![
                FieldKind::Text,
                FieldKind::Choice,
                FieldKind::Multiline,
                FieldKind::Checkbox,
                FieldKind::Unknown
            ]
        );
        assert!(FieldKind::Checkbox.is_boolean_like());
        assert!(!FieldKind::Choice.is_boolean_like());
    }

    #[test]
    fn test_choice_option_encodings() {
        let options: Vec<ChoiceOption> = serde_json::from_value(json!([
            ["Lawful Good", "LG"],
            { "displayValue": "Neutral", "exportValue": "N" },
            "Chaotic Evil"
        ]))
        .unwrap();
        assert_eq!(options[0], ChoiceOption::new("Lawful Good", "LG"));
        assert_eq!(options[1], ChoiceOption::new("Neutral", "N"));
        assert_eq!(options[2], ChoiceOption::new("Chaotic Evil", "Chaotic Evil"));
    }

    #[test]
    fn test_overlay_entry_untagged() {
        let positioned: OverlayEntry = serde_json::from_value(json!({
            "position": { "left": 1.0, "top": 2.0, "width": 3.0, "height": 4.0 },
            "fieldType": "checkbox"
        }))
        .unwrap();
        assert_eq!(positioned.position(), Some(&PixelRect::new(1.0, 2.0, 3.0, 4.0)));

        let raw = json!({ "fieldType": "text", "note": "no rect" });
        let pass: OverlayEntry = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(pass, OverlayEntry::PassThrough(raw));
    }

    #[test]
    fn test_metadata_lenient_deserialize() {
        let meta: OverlayMetadata =
            serde_json::from_value(json!({ "scale": 1.2, "offsetX": 3.5 })).unwrap();
        assert_eq!(meta.scale, 1.2);
        assert_eq!(meta.offset().offset_x, 3.5);
        assert!(meta.pass_through_fields.is_empty());
    }
}
