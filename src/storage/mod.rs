//! Progress storage for Skillpath.
//!
//! Durable per-player progress, with file-based and in-memory backends.

pub mod file;
pub mod memory;
pub mod traits;

pub use file::FileProgressStore;
pub use memory::MemoryProgressStore;
pub use traits::ProgressStore;
