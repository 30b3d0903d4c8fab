//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **memory**: process-local document store for tests and embedding.
//! - **filesystem**: JSON file per collection, written atomically.
//!
//! Adapters are thin translators between domain documents and their storage
//! representation. They contain no business logic.

pub mod filesystem;
pub mod memory;
mod server_time;

pub use filesystem::JsonFileDocumentStore;
pub use memory::InMemoryDocumentStore;
