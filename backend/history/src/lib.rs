//! `screensage-history` — durable append-only record of processed
//! screenshots, queryable by recency and id.

pub mod sqlite;
pub mod store;

pub use sqlite::SqliteHistoryStore;
pub use store::{HistoryStore, MemoryHistoryStore};
