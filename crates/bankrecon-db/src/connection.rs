//! Database connection handling.
//!
//! Opening walks a short candidate list (URI read-write, plain
//! read-write, create) so a job starts against whichever access mode the
//! deployment allows, and sets a 10-second busy timeout. Connections are
//! long-lived and reused for the whole job; each plan runs in its own
//! transaction.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, OpenFlags, Transaction};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::schema;

const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// A long-lived database handle for one job.
pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    /// Open the database, trying the candidate access modes in order.
    pub fn open(path: &Path) -> DbResult<Self> {
        let candidates = [
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_URI,
            OpenFlags::SQLITE_OPEN_READ_WRITE,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        ];

        let mut last_error = None;
        for flags in candidates {
            debug!(?flags, path = %path.display(), "trying database open mode");
            match Connection::open_with_flags(path, flags) {
                Ok(conn) => {
                    conn.busy_timeout(BUSY_TIMEOUT)?;
                    info!(path = %path.display(), "database connected");
                    return Ok(Self {
                        conn,
                        path: path.to_path_buf(),
                    });
                }
                Err(e) => last_error = Some(e),
            }
        }

        Err(DbError::Connect {
            path: path.display().to_string(),
            detail: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no candidate mode succeeded".to_string()),
        })
    }

    /// Open a fresh in-memory database with the schema applied.
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        schema::init_schema(&conn)?;
        Ok(Self {
            conn,
            path: PathBuf::from(":memory:"),
        })
    }

    /// Apply the schema (idempotent).
    pub fn init_schema(&self) -> DbResult<()> {
        schema::init_schema(&self.conn)
    }

    /// Quick connectivity probe.
    pub fn check(&self) -> DbResult<()> {
        self.conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    /// Begin the transaction a plan executes under.
    pub fn transaction(&mut self) -> DbResult<Transaction<'_>> {
        Ok(self.conn.transaction()?)
    }

    /// Read-only access for processors (SELECTs outside a plan).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
