//! layerbuf - layered byte buffer for text editors
//!
//! A mutable byte store built from segments over independently owned
//! layers, with marks that stay on the same logical byte across every
//! insertion, removal and compaction. Editor views drive it through marks;
//! it never touches encodings, files or rendering.

pub mod buffer;
pub mod config;
pub mod config_paths;
pub mod error;
pub mod tracing;
pub mod workload;

// Re-export commonly used types
pub use buffer::{Anchor, Buffer, BufferStats, Direction, Mark, MarkReader};
pub use config::BufferConfig;
pub use error::{BufferError, Result};
