pub mod http;
pub mod store;

pub use store::{MemorySignalStore, SignalStore, StoreError};
