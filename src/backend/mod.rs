//! Backend abstraction layer
//!
//! Contracts and plain data shared with the external command-encoding backend,
//! plus an in-memory recording backend.

pub mod recording;
pub mod traits;
pub mod types;

pub use recording::{RecordedCommand, RecordingBackend};
pub use traits::*;
pub use types::*;
