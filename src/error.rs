//! Crate-level error type

use thiserror::Error;

use crate::calibration::CalibrationError;
use crate::collaborators::CollaboratorError;
use crate::editor::EditorError;
use crate::geometry::GeometryError;
use crate::host::HostError;
use crate::viewer::ViewerError;

/// Any error this crate produces
#[derive(Debug, Error)]
pub enum OverlayError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Calibration(#[from] CalibrationError),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    Viewer(#[from] ViewerError),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error(transparent)]
    Editor(#[from] EditorError),
}

pub type Result<T> = std::result::Result<T, OverlayError>;
