//! Persistent Content Stores
//!
//! Implementations of [`ContentRepository`](crate::domain::ports::ContentRepository).

mod file;
mod memory;

pub use file::{FileContentStore, FileStoreConfig};
pub use memory::MemoryContentStore;
