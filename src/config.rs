//! Configuration management for Sheet Overlay

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::geometry::{CalibrationOffset, ConversionParameters, PixelRect};

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub conversion: ConversionParameters,
    pub calibration: CalibrationConfig,
    pub viewer: ViewerConfig,
}

/// Reference field and manual correction terms
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationConfig {
    pub reference_field: String,
    /// Known-correct on-screen position of the reference field
    pub reference_position: PixelRect,
    /// Added to the derived offset; empirically tuned, zero by default
    pub manual_correction: CalibrationOffset,
}

/// Viewer timings and layout workarounds
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    /// Wait before the first dimension check
    pub settle_delay: Duration,
    /// Wait before the single retry
    pub retry_delay: Duration,
    /// Wait between forced-render scroll steps
    pub scroll_settle: Duration,
    /// Wait before recollecting after a structural change
    pub recollect_delay: Duration,
    /// Height applied when the container reports zero height
    pub min_height: f64,
    /// Rendering engine worker endpoint
    pub worker_src: String,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            reference_field: "STR".to_string(),
            reference_position: PixelRect::new(150.0, 262.0, 68.0, 56.0),
            manual_correction: CalibrationOffset::default(),
        }
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(100),
            retry_delay: Duration::from_millis(300),
            scroll_settle: Duration::from_millis(200),
            recollect_delay: Duration::from_millis(100),
            min_height: 600.0,
            worker_src: "/pdf.worker.min.js".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            conversion: ConversionParameters::default(),
            calibration: CalibrationConfig::default(),
            viewer: ViewerConfig::default(),
        }
    }
}

/// Parse an env var, falling back to `default` when unset or malformed
fn parse_var<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(var = name, value = %raw, "Ignoring malformed value");
            default
        }),
        Err(_) => default,
    }
}

fn millis_var(name: &str, default: Duration) -> Duration {
    Duration::from_millis(parse_var(name, default.as_millis() as u64))
}

impl Config {
    /// Read configuration from the environment
    ///
    /// Every variable is optional; missing ones keep their defaults.
    pub fn from_env() -> Self {
        let defaults = Config::default();
        let reference = defaults.calibration.reference_position;

        Config {
            conversion: ConversionParameters {
                scale: parse_var("OVERLAY_SCALE", defaults.conversion.scale),
                dpi: parse_var("OVERLAY_DPI", defaults.conversion.dpi),
                page_height_pt: parse_var(
                    "OVERLAY_PAGE_HEIGHT_PT",
                    defaults.conversion.page_height_pt,
                ),
            },
            calibration: CalibrationConfig {
                reference_field: env::var("OVERLAY_REFERENCE_FIELD")
                    .unwrap_or(defaults.calibration.reference_field),
                reference_position: PixelRect {
                    left: parse_var("OVERLAY_REFERENCE_LEFT", reference.left),
                    top: parse_var("OVERLAY_REFERENCE_TOP", reference.top),
                    width: parse_var("OVERLAY_REFERENCE_WIDTH", reference.width),
                    height: parse_var("OVERLAY_REFERENCE_HEIGHT", reference.height),
                },
                manual_correction: CalibrationOffset {
                    offset_x: parse_var("OVERLAY_CORRECTION_X", 0.0),
                    offset_y: parse_var("OVERLAY_CORRECTION_Y", 0.0),
                },
            },
            viewer: ViewerConfig {
                settle_delay: millis_var("VIEWER_SETTLE_MS", defaults.viewer.settle_delay),
                retry_delay: millis_var("VIEWER_RETRY_MS", defaults.viewer.retry_delay),
                scroll_settle: millis_var(
                    "VIEWER_SCROLL_SETTLE_MS",
                    defaults.viewer.scroll_settle,
                ),
                recollect_delay: millis_var(
                    "VIEWER_RECOLLECT_MS",
                    defaults.viewer.recollect_delay,
                ),
                min_height: parse_var("VIEWER_MIN_HEIGHT", defaults.viewer.min_height),
                worker_src: env::var("VIEWER_WORKER_SRC").unwrap_or(defaults.viewer.worker_src),
            },
        }
    }
}
