//! quillpress/crates/storage-adapters/src/lib.rs
//!
//! `ContentStore` implementations. `MemoryStore` is always compiled: it is
//! the test double for everything transactional and the fallback store for
//! local development. The Postgres adapter sits behind `db-postgres`.

pub mod memory;

#[cfg(feature = "db-postgres")]
pub mod postgres;

pub use memory::MemoryStore;

#[cfg(feature = "db-postgres")]
pub use postgres::PgContentStore;
