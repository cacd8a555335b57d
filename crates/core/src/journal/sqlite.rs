use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection};

use super::{JournalError, OrderJournal};
use crate::order::Order;

/// SQLite-backed order journal.
pub struct SqliteOrderJournal {
    conn: Mutex<Connection>,
}

impl SqliteOrderJournal {
    /// Open (or create) the journal at `path`.
    pub fn new(path: &Path) -> Result<Self, JournalError> {
        let conn = Connection::open(path).map_err(|e| JournalError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory journal (useful for testing)
    pub fn in_memory() -> Result<Self, JournalError> {
        let conn =
            Connection::open_in_memory().map_err(|e| JournalError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), JournalError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS orders (
                id TEXT PRIMARY KEY,
                seq INTEGER NOT NULL,
                phase TEXT NOT NULL,
                data TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_orders_seq ON orders(seq);
            CREATE INDEX IF NOT EXISTS idx_orders_phase ON orders(phase);
            "#,
        )
        .map_err(|e| JournalError::Database(e.to_string()))
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, JournalError> {
        self.conn
            .lock()
            .map_err(|_| JournalError::Database("connection lock poisoned".to_string()))
    }
}

impl OrderJournal for SqliteOrderJournal {
    fn load_all(&self) -> Result<Vec<Order>, JournalError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT data FROM orders ORDER BY seq ASC")
            .map_err(|e| JournalError::Database(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| JournalError::Database(e.to_string()))?;

        let mut orders = Vec::new();
        for row in rows {
            let data = row.map_err(|e| JournalError::Database(e.to_string()))?;
            let order: Order = serde_json::from_str(&data)
                .map_err(|e| JournalError::Serialization(e.to_string()))?;
            orders.push(order);
        }
        Ok(orders)
    }

    fn upsert(&self, order: &Order) -> Result<(), JournalError> {
        let data =
            serde_json::to_string(order).map_err(|e| JournalError::Serialization(e.to_string()))?;

        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO orders (id, seq, phase, data, updated_at)
            VALUES (?1, (SELECT COALESCE(MAX(seq), 0) + 1 FROM orders), ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                seq = excluded.seq,
                phase = excluded.phase,
                data = excluded.data,
                updated_at = excluded.updated_at
            "#,
            params![
                order.id,
                order.status.as_str(),
                data,
                chrono::Utc::now().to_rfc3339()
            ],
        )
        .map_err(|e| JournalError::Database(e.to_string()))?;
        Ok(())
    }

    fn remove(&self, order_id: &str) -> Result<bool, JournalError> {
        let conn = self.conn()?;
        let deleted = conn
            .execute("DELETE FROM orders WHERE id = ?1", params![order_id])
            .map_err(|e| JournalError::Database(e.to_string()))?;
        Ok(deleted > 0)
    }
}
