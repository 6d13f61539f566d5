//! Calibration extraction
//!
//! Offline pass that turns a coordinate dataset (native rectangles per
//! field) into an overlay-position dataset (pixel rectangles per field),
//! aligned to ground truth through a single reference field.
//!
//! # Usage
//!
//! ```rust,ignore
//! use sheet_overlay::calibration::{io, CalibrationExtractor, CalibrationReference};
//!
//! let input = io::load_coordinates("coords.json").await?;
//! let prior = io::load_overlay_if_exists("overlay.json").await?;
//! let extractor = CalibrationExtractor::new(params, reference, correction)?;
//! let output = extractor.extract(&input, prior.as_ref())?;
//! io::write_overlay("overlay.json", &output).await?;
//! ```

mod error;
mod extractor;
pub mod io;
mod types;

pub use error::{CalibrationError, Result};
pub use extractor::{Calibration, CalibrationExtractor, CalibrationReference};
pub use types::{
    ChoiceOption, CoordinateDataset, FieldAttributes, FieldCoordinate, FieldKind, OverlayDataset,
    OverlayEntry, OverlayField, OverlayMetadata, PDF_RECT_KEY,
};
