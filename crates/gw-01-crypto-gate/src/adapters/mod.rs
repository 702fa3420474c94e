//! Adapters layer: concrete key store backends.

pub mod fs;
pub mod memory;

pub use fs::FsRootKeyStore;
pub use memory::MemoryRootKeyStore;
