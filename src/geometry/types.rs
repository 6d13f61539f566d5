//! Geometry types
//!
//! Native (point) and pixel-space rectangles plus the parameters that
//! connect them.

use serde::{Deserialize, Serialize};

use super::error::GeometryError;

/// Typographic points per inch
pub const POINTS_PER_INCH: f64 = 72.0;

/// Field rectangle in the document's native space
///
/// Corners may arrive in either order; the accessors normalize them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NativeRect {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl NativeRect {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Build from a `[x1, y1, x2, y2]` array as found in coordinate datasets
    pub fn from_slice(values: &[f64]) -> Result<Self, GeometryError> {
        let [x1, y1, x2, y2] = values else {
            return Err(GeometryError::InvalidRect(values.len()));
        };
        if values.iter().any(|v| !v.is_finite()) {
            return Err(GeometryError::NonFinite);
        }
        Ok(Self::new(*x1, *y1, *x2, *y2))
    }

    pub fn left(&self) -> f64 {
        self.x1.min(self.x2)
    }

    pub fn right(&self) -> f64 {
        self.x1.max(self.x2)
    }

    /// Visually higher edge (larger Y in native space)
    pub fn top(&self) -> f64 {
        self.y1.max(self.y2)
    }

    pub fn bottom(&self) -> f64 {
        self.y1.min(self.y2)
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

/// Rectangle in pixel space, origin top-left
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PixelRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelRect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Zero-area boxes are valid output but useless as input targets
    pub fn is_degenerate(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Copy rounded to two decimals, for persisted datasets only
    pub fn rounded(&self) -> Self {
        use super::transform::round2;
        Self {
            left: round2(self.left),
            top: round2(self.top),
            width: round2(self.width),
            height: round2(self.height),
        }
    }
}

/// Scale, density and page height used to map points to pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionParameters {
    /// Zoom factor applied to the rendering surface
    pub scale: f64,
    /// Target pixel density
    pub dpi: f64,
    /// Native height of the page containing the field
    #[serde(rename = "pageHeightPt")]
    pub page_height_pt: f64,
}

impl ConversionParameters {
    pub fn new(scale: f64, dpi: f64, page_height_pt: f64) -> Result<Self, GeometryError> {
        let params = Self {
            scale,
            dpi,
            page_height_pt,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), GeometryError> {
        for (name, value) in [
            ("scale", self.scale),
            ("dpi", self.dpi),
            ("pageHeightPt", self.page_height_pt),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(GeometryError::InvalidParameters(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// `(dpi / 72) * scale`
    pub fn points_to_pixels(&self) -> f64 {
        (self.dpi / POINTS_PER_INCH) * self.scale
    }

    pub fn page_height_px(&self) -> f64 {
        self.page_height_pt * self.points_to_pixels()
    }
}

impl Default for ConversionParameters {
    fn default() -> Self {
        Self {
            scale: 1.2,
            dpi: 96.0,
            page_height_pt: 803.0,
        }
    }
}

/// Correction vector subtracted from every transformed position
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationOffset {
    #[serde(rename = "offsetX")]
    pub offset_x: f64,
    #[serde(rename = "offsetY")]
    pub offset_y: f64,
}

impl CalibrationOffset {
    pub fn new(offset_x: f64, offset_y: f64) -> Self {
        Self { offset_x, offset_y }
    }

    /// `calculated − known`, the offset that maps `calculated` onto `known`
    pub fn between(calculated: &PixelRect, known: &PixelRect) -> Self {
        Self {
            offset_x: calculated.left - known.left,
            offset_y: calculated.top - known.top,
        }
    }

    /// Accumulate a manual correction term
    pub fn plus(&self, correction: &CalibrationOffset) -> Self {
        Self {
            offset_x: self.offset_x + correction.offset_x,
            offset_y: self.offset_y + correction.offset_y,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.offset_x == 0.0 && self.offset_y == 0.0
    }
}
