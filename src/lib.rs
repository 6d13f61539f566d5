//! Sheet Overlay
//!
//! Aligned form-field overlays for fixed-layout character sheets:
//! - `geometry`: native point rectangles to pixel rectangles
//! - `calibration`: offline extraction of the overlay position dataset
//! - `viewer`: lifecycle of the rendering surface in a host container
//! - `sync`: two-way binding between live controls and a value map

pub mod calibration;
pub mod collaborators;
pub mod config;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod host;
pub mod sync;
pub mod viewer;

pub use config::Config;
pub use error::{OverlayError, Result};
