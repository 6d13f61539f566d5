//! Coordinate transform pipeline
//!
//! Converts field rectangles from the document's native space (origin
//! bottom-left, unit = point) into the rendering surface's pixel space
//! (origin top-left), and applies the calibration offset.
//!
//! ```text
//!   native rect (pt)  ──►  × pointsToPixels  ──►  Y flip  ──►  − offset
//!   [x1,y1,x2,y2]          (dpi/72)·scale        pageH−y       PixelRect
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use sheet_overlay::geometry::{ConversionParameters, NativeRect, PixelTransformer};
//!
//! let params = ConversionParameters::new(1.2, 96.0, 803.0)?;
//! let transformer = PixelTransformer::new(params);
//! let rect = transformer.to_pixel_rect(&NativeRect::new(101.49, 595.28, 143.99, 630.28));
//! ```

mod error;
mod transform;
mod types;

pub use error::GeometryError;
pub use transform::{apply_offset, round2, to_pixel_rect, PixelTransformer};
pub use types::{CalibrationOffset, ConversionParameters, NativeRect, PixelRect, POINTS_PER_INCH};
