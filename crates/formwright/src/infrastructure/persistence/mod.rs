//! Form store adapters

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryFormStore;
