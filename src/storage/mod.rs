pub mod kv;
pub mod persist;

pub use kv::{FileStore, KeyValueStore, MemoryStore};
pub use persist::{Loaded, Persistence};
