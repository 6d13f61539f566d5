//! Host environment error types

use thiserror::Error;

/// Errors raised by host implementations
#[derive(Debug, Clone, Error, PartialEq)]
pub enum HostError {
    /// Worker endpoint could not be configured
    #[error("Worker configuration failed: {0}")]
    Worker(String),

    /// Engine construction failed
    #[error("Engine creation failed: {0}")]
    Engine(String),

    /// Document fetch or decode failed
    #[error("Document load failed: {0}")]
    Load(String),

    /// Page rendering failed
    #[error("Render error: {0}")]
    Render(String),

    /// Engine was destroyed while an operation was pending
    #[error("Engine destroyed")]
    Destroyed,
}
