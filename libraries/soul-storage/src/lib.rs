//! Soul Player Storage
//!
//! Durable key/value stores for persisted playback state.
//!
//! The playback core stores each persisted domain as one opaque blob.
//! This crate provides two implementations of
//! [`soul_core::KeyValueStore`]:
//!
//! - [`SqliteKeyValueStore`]: `SQLite` database (WAL mode, embedded migration)
//! - [`MemoryKeyValueStore`]: volatile map for tests and headless hosts
//!
//! # Example
//!
//! ```rust,no_run
//! use soul_core::KeyValueStore;
//! use soul_storage::SqliteKeyValueStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteKeyValueStore::new("sqlite://soul.db").await?;
//! store.save("playback", br#"{"queue":[]}"#).await?;
//! let blob = store.load("playback").await?;
//! # Ok(())
//! # }
//! ```

mod database;
mod error;
mod memory;

pub use database::SqliteKeyValueStore;
pub use error::{Result, StorageError};
pub use memory::MemoryKeyValueStore;
