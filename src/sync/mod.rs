//! Field synchronization
//!
//! - `values`: extraction and injection rules per control kind
//! - `synchronizer`: listener registry, structural resync, delayed recollection

mod synchronizer;
mod values;

pub use synchronizer::{FieldSynchronizer, ValueCallback};
pub use values::{collect_values, control_value, inject_value, inject_values, FieldValueMap};
