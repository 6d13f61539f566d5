//! Viewer lifecycle states

use serde::Serialize;
use uuid::Uuid;

use crate::sync::FieldValueMap;

/// Lifecycle state of one viewer session
///
/// ```text
/// Unmounted → AwaitingDimensions → Initializing → DocumentLoading
///           → PagesRendering → Ready
/// any non-terminal state → TornDown
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewerState {
    #[default]
    Unmounted,
    AwaitingDimensions,
    Initializing,
    DocumentLoading,
    PagesRendering,
    Ready,
    TornDown,
}

impl ViewerState {
    /// Guard for the lifecycle's forward edges
    pub fn can_transition_to(self, next: ViewerState) -> bool {
        use ViewerState::*;
        match (self, next) {
            (TornDown, _) => false,
            (_, TornDown) => true,
            (Unmounted, AwaitingDimensions)
            | (AwaitingDimensions, Initializing)
            | (Initializing, DocumentLoading)
            | (DocumentLoading, PagesRendering)
            | (PagesRendering, Ready) => true,
            _ => false,
        }
    }

    pub fn is_ready(self) -> bool {
        self == ViewerState::Ready
    }
}

/// Notifications emitted by the controller
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    StateChanged { session_id: Uuid, state: ViewerState },
    /// Full value map after a recollection
    Values(FieldValueMap),
    /// Document fetch/decode failed; reported once per session
    LoadFailed { session_id: Uuid, message: String },
}
