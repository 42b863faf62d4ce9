//! Persistent storage: repository trait + adapters.

pub mod memory;
pub mod migrations;
pub mod postgres;
pub mod repository;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use repository::Store;
