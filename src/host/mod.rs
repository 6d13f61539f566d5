//! Host environment seam
//!
//! Traits the embedding environment implements (container, controls,
//! rendering engine) and an in-memory implementation used by tests and
//! the `simulate` command.

mod error;
pub mod memory;
mod traits;
mod types;

pub use error::HostError;
pub use traits::{EngineFactory, FieldControl, HostContainer, RenderingEngine};
pub use types::{
    ContainerDimensions, ControlEventKind, ControlKind, DocumentInfo, HostEvent, HostEventSink,
    ListenerId, Liveness, WatchId,
};
