//! Native → pixel rectangle transform

use super::types::{CalibrationOffset, ConversionParameters, NativeRect, PixelRect};

/// Transformer with the points-to-pixels ratio resolved once
///
/// The ratio depends only on scale and DPI, so one transformer serves
/// every field on pages sharing those parameters.
#[derive(Debug, Clone, Copy)]
pub struct PixelTransformer {
    params: ConversionParameters,
    points_to_pixels: f64,
    page_height_px: f64,
}

impl PixelTransformer {
    pub fn new(params: ConversionParameters) -> Self {
        let points_to_pixels = params.points_to_pixels();
        Self {
            params,
            points_to_pixels,
            page_height_px: params.page_height_pt * points_to_pixels,
        }
    }

    pub fn params(&self) -> &ConversionParameters {
        &self.params
    }

    pub fn points_to_pixels(&self) -> f64 {
        self.points_to_pixels
    }

    pub fn page_height_px(&self) -> f64 {
        self.page_height_px
    }

    /// Scale and Y-flip a native rectangle. No rounding is applied.
    pub fn to_pixel_rect(&self, rect: &NativeRect) -> PixelRect {
        let ratio = self.points_to_pixels;

        let left = rect.left() * ratio;
        let right = rect.right() * ratio;
        let top_px = rect.top() * ratio;
        let bottom_px = rect.bottom() * ratio;

        let html_top = self.page_height_px - top_px;
        let html_bottom = self.page_height_px - bottom_px;

        PixelRect {
            left,
            top: html_top,
            width: right - left,
            height: html_bottom - html_top,
        }
    }

    /// Transform and correct in one step
    pub fn to_corrected_rect(&self, rect: &NativeRect, offset: &CalibrationOffset) -> PixelRect {
        apply_offset(&self.to_pixel_rect(rect), offset)
    }
}

/// One-shot transform; prefer [`PixelTransformer`] when converting many fields
pub fn to_pixel_rect(rect: &NativeRect, params: &ConversionParameters) -> PixelRect {
    PixelTransformer::new(*params).to_pixel_rect(rect)
}

/// Shift a rectangle by the calibration offset. Size is untouched.
pub fn apply_offset(rect: &PixelRect, offset: &CalibrationOffset) -> PixelRect {
    PixelRect {
        left: rect.left - offset.offset_x,
        top: rect.top - offset.offset_y,
        width: rect.width,
        height: rect.height,
    }
}

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_rect() -> NativeRect {
        NativeRect::new(101.49, 595.28, 143.99, 630.28)
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_reference_field_transform() {
        let transformer = PixelTransformer::new(ConversionParameters::default());
        let rect = transformer.to_pixel_rect(&reference_rect());

        assert!(approx(transformer.points_to_pixels(), 1.6));
        assert!(approx(rect.left, 162.384));
        assert!(approx(rect.top, 276.352));
        assert!(approx(rect.width, 68.0));
        assert!(approx(rect.height, 56.0));

        let rounded = rect.rounded();
        assert_eq!(rounded.left, 162.38);
        assert_eq!(rounded.top, 276.35);
    }

    #[test]
    fn test_corner_order_does_not_matter() {
        let params = ConversionParameters::default();
        let a = to_pixel_rect(&NativeRect::new(10.0, 20.0, 30.0, 50.0), &params);
        let b = to_pixel_rect(&NativeRect::new(30.0, 50.0, 10.0, 20.0), &params);
        let c = to_pixel_rect(&NativeRect::new(10.0, 50.0, 30.0, 20.0), &params);
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert!(a.width >= 0.0 && a.height >= 0.0);
    }

    #[test]
    fn test_size_never_negative() {
        let params = ConversionParameters::new(2.0, 150.0, 792.0).unwrap();
        let corners = [
            (0.0, 0.0, 612.0, 792.0),
            (612.0, 792.0, 0.0, 0.0),
            (400.5, 10.25, 12.75, 300.0),
            (-5.0, -5.0, -20.0, 40.0),
        ];
        for (x1, y1, x2, y2) in corners {
            let rect = to_pixel_rect(&NativeRect::new(x1, y1, x2, y2), &params);
            assert!(rect.width >= 0.0, "width negative for {:?}", (x1, y1, x2, y2));
            assert!(rect.height >= 0.0, "height negative for {:?}", (x1, y1, x2, y2));
        }
    }

    #[test]
    fn test_equal_corners_yield_zero_size() {
        let rect = to_pixel_rect(
            &NativeRect::new(50.0, 50.0, 50.0, 50.0),
            &ConversionParameters::default(),
        );
        assert_eq!(rect.width, 0.0);
        assert_eq!(rect.height, 0.0);
        assert!(rect.is_degenerate());
    }

    #[test]
    fn test_ratio_shared_across_fields() {
        let transformer = PixelTransformer::new(ConversionParameters::default());
        let ratio = transformer.points_to_pixels();
        for x in [0.0, 10.0, 250.0, 600.0] {
            let rect = transformer.to_pixel_rect(&NativeRect::new(x, 0.0, x + 10.0, 10.0));
            assert!(approx(rect.left, x * ratio));
            assert!(approx(rect.width, 10.0 * ratio));
        }
    }

    #[test]
    fn test_apply_offset_keeps_size() {
        let rect = PixelRect::new(100.0, 200.0, 40.0, 20.0);
        let shifted = apply_offset(&rect, &CalibrationOffset::new(10.0, -5.0));
        assert_eq!(shifted, PixelRect::new(90.0, 205.0, 40.0, 20.0));
    }

    #[test]
    fn test_offset_round_trip_on_reference() {
        let transformer = PixelTransformer::new(ConversionParameters::default());
        let known = PixelRect::new(150.0, 262.0, 68.0, 56.0);
        let calculated = transformer.to_pixel_rect(&reference_rect());
        let offset = CalibrationOffset::between(&calculated, &known);

        let corrected = transformer.to_corrected_rect(&reference_rect(), &offset);
        assert!(approx(corrected.left, known.left));
        assert!(approx(corrected.top, known.top));
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.005_1), 1.01);
        assert_eq!(round2(276.352), 276.35);
        assert_eq!(round2(-3.14159), -3.14);
    }
}
