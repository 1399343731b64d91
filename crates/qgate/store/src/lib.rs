//! Key-value store adapters for qgate.
//!
//! A gate persists its record through the [`KeyValueStore`] contract, keyed
//! by `(store name, key)`. Two adapters ship with the crate:
//! - [`InMemoryStore`] for tests and ephemeral hosts
//! - [`JsonFileStore`] keeping one JSON document per store name on disk
//!
//! One adapter may be shared by many gates; entries are isolated per
//! `(store, key)` pair.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod error;
pub mod file;
pub mod memory;
mod traits;

pub use error::{StoreError, StoreResult};
pub use file::JsonFileStore;
pub use memory::InMemoryStore;
pub use traits::KeyValueStore;
