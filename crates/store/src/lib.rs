//! Embedded record store for bookstack.
//!
//! Modules hand the store an explicit [`TableSchema`] at startup; the store
//! then enforces the declared unique indexes atomically on every write. This
//! is the authoritative guard for uniqueness invariants — application-level
//! pre-checks can race, the table lock here cannot.

pub mod error;
pub mod memory;
pub mod schema;

pub use error::StoreError;
pub use memory::{MemoryStore, RecordId, Row};
pub use schema::TableSchema;
