//! Host environment traits
//!
//! The viewer never touches a concrete UI toolkit. The embedding
//! environment implements these traits over its container element,
//! input controls and document rendering library.

use std::sync::Arc;

use async_trait::async_trait;

use super::error::HostError;
use super::types::{
    ContainerDimensions, ControlKind, DocumentInfo, HostEventSink, ListenerId, WatchId,
};

/// A live input control created by the rendering engine
pub trait FieldControl: Send + Sync {
    /// Identifying attribute; controls without one are ignored
    fn name(&self) -> Option<String>;

    fn kind(&self) -> ControlKind;

    /// Raw current value (empty when unset)
    fn value(&self) -> String;

    fn set_value(&self, value: &str);

    /// Active state for boolean-like controls
    fn is_checked(&self) -> bool;

    fn set_checked(&self, checked: bool);

    /// Export value reported when a boolean-like control is active
    fn on_value(&self) -> String;

    fn set_read_only(&self, read_only: bool);

    fn is_read_only(&self) -> bool;

    /// Subscribe to input/change/blur notifications
    fn add_listener(&self, sink: HostEventSink) -> ListenerId;

    fn remove_listener(&self, id: ListenerId);
}

/// Element the viewer renders into
pub trait HostContainer: Send + Sync {
    fn dimensions(&self) -> ContainerDimensions;

    /// Remove everything below the container
    fn clear(&self);

    /// Recreate the internal structure the rendering engine expects
    fn rebuild(&self);

    /// Force explicit pixel dimensions
    fn apply_size(&self, width: f64, height: f64);

    /// Total scrollable height of the rendered content
    fn scroll_height(&self) -> f64;

    fn scroll_to(&self, top: f64);

    /// Every control currently below the container
    fn controls(&self) -> Vec<Arc<dyn FieldControl>>;

    /// Subscribe to subtree additions
    fn watch_structure(&self, sink: HostEventSink) -> WatchId;

    fn unwatch_structure(&self, id: WatchId);
}

/// Document rendering engine bound to one container
#[async_trait]
pub trait RenderingEngine: Send + Sync {
    /// Fetch and decode the document, then hand it to the viewer
    async fn load_document(&self, locator: &str) -> Result<DocumentInfo, HostError>;

    /// Resolves once the first page has rendered
    async fn first_page_ready(&self) -> Result<(), HostError>;

    /// Drop all internal references; later calls must not touch the container
    fn destroy(&self);
}

/// Builds rendering engines
pub trait EngineFactory: Send + Sync {
    /// Point the engine at its worker endpoint
    fn configure_worker(&self, worker_src: &str) -> Result<(), HostError>;

    fn create(
        &self,
        container: Arc<dyn HostContainer>,
    ) -> Result<Arc<dyn RenderingEngine>, HostError>;
}
