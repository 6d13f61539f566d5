//! External collaborators
//!
//! Interface-level contracts for record persistence, authentication and
//! blob storage, with in-memory implementations.

mod error;
pub mod memory;
mod traits;
mod types;

pub use error::{CollaboratorError, Result};
pub use memory::{MemoryBlobStore, MemoryRecordStore, StaticAuth};
pub use traits::{AuthProvider, BlobStore, RecordStore};
pub use types::{AuthUser, BlobMetadata, CharacterRecord};
