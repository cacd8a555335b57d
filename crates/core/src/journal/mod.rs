//! Local persistence of the board across restarts.

mod sqlite;

pub use sqlite::SqliteOrderJournal;

use thiserror::Error;

use crate::order::Order;

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Trait for order journal backends.
///
/// Writes come from the desk task only, one call per applied change.
pub trait OrderJournal: Send + Sync {
    /// Every journaled order, in the sequence it was last written.
    fn load_all(&self) -> Result<Vec<Order>, JournalError>;

    /// Insert or replace an order. A replaced order moves to the end.
    fn upsert(&self, order: &Order) -> Result<(), JournalError>;

    /// Forget an order. Returns false if it was not journaled.
    fn remove(&self, order_id: &str) -> Result<bool, JournalError>;
}
