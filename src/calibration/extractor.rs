//! Calibration extractor
//!
//! Derives the calibration offset from one reference field whose correct
//! on-screen position is known, then converts every field in the dataset.

use std::collections::BTreeMap;

use chrono::Utc;

use crate::geometry::{
    round2, CalibrationOffset, ConversionParameters, PixelRect, PixelTransformer,
};

use super::error::{CalibrationError, Result};
use super::types::{
    CoordinateDataset, FieldCoordinate, OverlayDataset, OverlayEntry, OverlayField,
    OverlayMetadata,
};

/// Field whose on-screen position is known a priori
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationReference {
    pub field: String,
    pub position: PixelRect,
}

impl CalibrationReference {
    pub fn new(field: impl Into<String>, position: PixelRect) -> Self {
        Self {
            field: field.into(),
            position,
        }
    }
}

/// Outcome of the calibration step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// Offset subtracted from every transformed field
    pub offset: CalibrationOffset,
    /// Reference field as computed by the transform, before correction
    pub calculated: PixelRect,
}

/// Batch converter from native coordinates to overlay positions
#[derive(Debug, Clone)]
pub struct CalibrationExtractor {
    transformer: PixelTransformer,
    reference: CalibrationReference,
    manual_correction: CalibrationOffset,
}

impl CalibrationExtractor {
    /// Create an extractor
    ///
    /// `manual_correction` is added to the derived offset. It defaults to
    /// zero in configuration and should be re-tuned per reference field.
    pub fn new(
        params: ConversionParameters,
        reference: CalibrationReference,
        manual_correction: CalibrationOffset,
    ) -> Result<Self> {
        params.validate()?;
        if reference.position.is_degenerate() {
            return Err(CalibrationError::DegenerateReference(reference.field));
        }
        Ok(Self {
            transformer: PixelTransformer::new(params),
            reference,
            manual_correction,
        })
    }

    pub fn params(&self) -> &ConversionParameters {
        self.transformer.params()
    }

    pub fn reference(&self) -> &CalibrationReference {
        &self.reference
    }

    /// Derive the offset from the reference field
    pub fn calibrate(&self, dataset: &CoordinateDataset) -> Result<Calibration> {
        let field = dataset
            .field(&self.reference.field)
            .ok_or_else(|| CalibrationError::ReferenceNotFound(self.reference.field.clone()))?
            .map_err(|reason| CalibrationError::InvalidReference {
                field: self.reference.field.clone(),
                reason,
            })?;

        let calculated = self.transformer.to_pixel_rect(&field.native_rect);
        let offset = CalibrationOffset::between(&calculated, &self.reference.position)
            .plus(&self.manual_correction);

        tracing::debug!(
            reference = %self.reference.field,
            calculated_left = calculated.left,
            calculated_top = calculated.top,
            offset_x = offset.offset_x,
            offset_y = offset.offset_y,
            "Derived calibration offset"
        );

        Ok(Calibration { offset, calculated })
    }

    /// Convert every field of `dataset`
    ///
    /// Entries without a usable rectangle are never dropped: they are copied
    /// from `prior` when it has an entry of the same name, otherwise kept
    /// exactly as they appear in the input.
    pub fn extract(
        &self,
        dataset: &CoordinateDataset,
        prior: Option<&OverlayDataset>,
    ) -> Result<OverlayDataset> {
        let calibration = self.calibrate(dataset)?;

        let mut fields = BTreeMap::new();
        let mut pass_through_fields = Vec::new();
        let mut degenerate_fields = Vec::new();

        for (name, raw) in &dataset.fields {
            match FieldCoordinate::from_entry(name, raw) {
                Ok(field) => {
                    let position = self
                        .transformer
                        .to_corrected_rect(&field.native_rect, &calibration.offset);
                    if position.is_degenerate() {
                        tracing::warn!(field = %name, "Field has a zero-size box");
                        degenerate_fields.push(name.clone());
                    }
                    fields.insert(
                        name.clone(),
                        OverlayEntry::Positioned(OverlayField {
                            position: position.rounded(),
                            attributes: field.attributes,
                        }),
                    );
                }
                Err(reason) => {
                    let carried = prior.and_then(|p| p.fields.get(name)).cloned();
                    tracing::debug!(
                        field = %name,
                        reason = %reason,
                        from_prior = carried.is_some(),
                        "Passing field through unchanged"
                    );
                    pass_through_fields.push(name.clone());
                    fields.insert(
                        name.clone(),
                        carried.unwrap_or_else(|| OverlayEntry::PassThrough(raw.clone())),
                    );
                }
            }
        }

        let params = self.transformer.params();
        let metadata = OverlayMetadata {
            scale: params.scale,
            dpi: params.dpi,
            page_height_pt: params.page_height_pt,
            points_to_pixels: self.transformer.points_to_pixels(),
            offset_x: round2(calibration.offset.offset_x),
            offset_y: round2(calibration.offset.offset_y),
            manual_correction: self.manual_correction,
            reference_field: self.reference.field.clone(),
            calculated_position: calibration.calculated.rounded(),
            reference_position: self.reference.position,
            field_count: fields.len(),
            pass_through_fields,
            degenerate_fields,
            generated_at: Utc::now(),
        };

        tracing::info!(
            fields = metadata.field_count,
            pass_through = metadata.pass_through_fields.len(),
            degenerate = metadata.degenerate_fields.len(),
            "Extracted overlay positions"
        );

        Ok(OverlayDataset { metadata, fields })
    }
}
