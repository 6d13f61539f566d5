//! Host environment types

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

use crate::calibration::FieldKind;

/// Measured size and visibility of the host container
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ContainerDimensions {
    pub width: f64,
    pub height: f64,
    /// False when the container or an ancestor is hidden
    pub visible: bool,
}

impl ContainerDimensions {
    pub fn new(width: f64, height: f64, visible: bool) -> Self {
        Self {
            width,
            height,
            visible,
        }
    }

    /// Positive size and not hidden
    pub fn is_usable(&self) -> bool {
        self.visible && self.width > 0.0 && self.height > 0.0
    }
}

/// Kind of live input control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    #[default]
    Text,
    Choice,
    Multiline,
    /// Checkbox or radio button
    Checkbox,
}

impl ControlKind {
    pub fn is_boolean_like(&self) -> bool {
        matches!(self, Self::Checkbox)
    }
}

impl From<FieldKind> for ControlKind {
    fn from(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Text | FieldKind::Unknown => Self::Text,
            FieldKind::Choice => Self::Choice,
            FieldKind::Multiline => Self::Multiline,
            FieldKind::Checkbox => Self::Checkbox,
        }
    }
}

/// Notification kinds a control can raise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEventKind {
    Input,
    Change,
    Blur,
}

/// Event delivered by the host to a registered sink
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// A control's value or focus changed
    Control {
        kind: ControlEventKind,
        name: Option<String>,
    },
    /// Nodes carrying controls were added below the container
    Structure { added: usize },
}

/// Channel end the host pushes events into
pub type HostEventSink = UnboundedSender<HostEvent>;

/// Handle for a registered control listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Handle for a registered structural watch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(pub u64);

/// Summary of a loaded document
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentInfo {
    pub locator: String,
    pub page_count: usize,
}

/// Liveness flag shared by every continuation of one viewer session
///
/// Once revoked it stays revoked; a continuation that observes `false`
/// must return without touching the container.
#[derive(Debug, Clone)]
pub struct Liveness {
    alive: Arc<AtomicBool>,
}

impl Liveness {
    pub fn new() -> Self {
        Self {
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub fn revoke(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions_usable() {
        assert!(ContainerDimensions::new(800.0, 600.0, true).is_usable());
        assert!(!ContainerDimensions::new(0.0, 600.0, true).is_usable());
        assert!(!ContainerDimensions::new(800.0, 0.0, true).is_usable());
        assert!(!ContainerDimensions::new(800.0, 600.0, false).is_usable());
    }

    #[test]
    fn test_liveness_revocation_is_shared() {
        let liveness = Liveness::new();
        let clone = liveness.clone();
        assert!(clone.is_alive());
        liveness.revoke();
        assert!(!clone.is_alive());
    }

    #[test]
    fn test_control_kind_from_field_kind() {
        assert_eq!(ControlKind::from(FieldKind::Checkbox), ControlKind::Checkbox);
        assert_eq!(ControlKind::from(FieldKind::Unknown), ControlKind::Text);
        assert!(ControlKind::Checkbox.is_boolean_like());
    }
}
