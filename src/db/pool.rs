//! SQLite connection wrapper.
//!
//! One `DbPool` owns one connection. Writers serialize through
//! `BEGIN IMMEDIATE`, and WAL mode lets readers keep a consistent
//! snapshot while a write is in flight.

use crate::db::initialize::init_db;
use crate::errors::AppResult;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::time::Duration;

pub struct DbPool {
    pub conn: Connection,
}

impl DbPool {
    /// Open (or create) a database file and bring the schema up to date.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> AppResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        conn.busy_timeout(busy_timeout)?;
        // journal_mode returns a row, so it cannot go through execute_batch
        let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        Self::prepare(conn)
    }

    /// Private in-memory database, used by tests.
    pub fn in_memory() -> AppResult<Self> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(conn: Connection) -> AppResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        init_db(&conn)?;
        Ok(Self { conn })
    }

    /// Write transaction: takes the database write lock up front so two
    /// writers can never interleave their read-then-write sequences.
    pub fn write_tx(&mut self) -> AppResult<Transaction<'_>> {
        Ok(self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?)
    }

    /// Read transaction: every query inside sees the same snapshot.
    pub fn read_tx(&mut self) -> AppResult<Transaction<'_>> {
        Ok(self
            .conn
            .transaction_with_behavior(TransactionBehavior::Deferred)?)
    }
}
