//! qmtrainer-store: configuration and session persistence.
//!
//! Implements the `SessionStore` trait from `qmtrainer-core` with a
//! JSON-file backend and an in-memory backend, and loads the qmtrainer
//! configuration that selects between them.

pub mod config;
pub mod json_file;
pub mod memory;

pub use config::{create_store, load_config, load_config_from, load_protocol, QmConfig, StoreKind};
pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
