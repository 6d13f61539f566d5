//! Viewer lifecycle
//!
//! [`ViewerLifecycleController`] mounts a rendering engine into a host
//! container, waits for every page to render and hands the live controls
//! to a [`FieldSynchronizer`](crate::sync::FieldSynchronizer).

mod controller;
mod error;
mod session;
mod state;

pub use controller::{ViewerLifecycleController, ViewerProps};
pub use error::ViewerError;
pub use session::ViewerSession;
pub use state::{ViewerEvent, ViewerState};
