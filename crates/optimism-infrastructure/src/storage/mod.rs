//! Client-local storage.

pub mod atomic_json;
pub mod file_kv_store;
pub mod memory_kv_store;

pub use atomic_json::AtomicJsonFile;
pub use file_kv_store::FileKeyValueStore;
pub use memory_kv_store::InMemoryKeyValueStore;
