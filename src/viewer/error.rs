//! Viewer error types

use thiserror::Error;

use crate::host::HostError;

use super::state::ViewerState;

/// Errors raised while driving a viewer session
///
/// None of these escape the controller: initialization errors are logged
/// and swallowed, load and render errors become a `LoadFailed` event.
#[derive(Debug, Error, PartialEq)]
pub enum ViewerError {
    #[error("Viewer initialization failed: {0}")]
    Initialization(HostError),

    #[error("Document load failed: {0}")]
    DocumentLoad(HostError),

    #[error("Page rendering failed: {0}")]
    Render(HostError),

    #[error("Invalid transition from {from:?} to {to:?}")]
    InvalidTransition { from: ViewerState, to: ViewerState },
}

impl ViewerError {
    /// Load and render failures are reported to the caller
    pub fn is_load_failure(&self) -> bool {
        matches!(self, Self::DocumentLoad(_) | Self::Render(_))
    }
}
