use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;
use tracing::info;

use sidebar_types::models::FavouriteRecord;

use super::FavouritesError;

/// Schema version recorded in `PRAGMA user_version`.
pub const SCHEMA_VERSION: i64 = 1;

/// Local favourites database. Records are keyed by `(backend, share, path)`
/// with a secondary index on `(backend, share, parent)`.
pub struct FavouritesDb {
    conn: Mutex<Connection>,
}

impl FavouritesDb {
    pub fn open(path: &Path) -> Result<Self, FavouritesError> {
        let conn = Connection::open(path)?;
        upgrade(&conn)?;
        info!("Favourites DB opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, FavouritesError> {
        let conn = Connection::open_in_memory()?;
        upgrade(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, FavouritesError> {
        self.conn.lock().map_err(|_| FavouritesError::Poisoned)
    }

    #[cfg(test)]
    pub fn get(
        &self,
        backend: &str,
        share: &str,
        path: &str,
    ) -> Result<Option<FavouriteRecord>, FavouritesError> {
        use rusqlite::OptionalExtension;

        let conn = self.lock()?;
        let record = conn
            .query_row(
                "SELECT backend, share, path FROM favourites
                 WHERE backend = ?1 AND share = ?2 AND path = ?3",
                (backend, share, path),
                read_record,
            )
            .optional()?;
        Ok(record)
    }

    /// Insert or replace a record.
    pub fn put(&self, record: &FavouriteRecord) -> Result<(), FavouritesError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        insert(&tx, record)?;
        tx.commit()?;
        Ok(())
    }

    /// Delete by primary key. Deleting a missing record is not an error.
    pub fn delete(&self, backend: &str, share: &str, path: &str) -> Result<(), FavouritesError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM favourites WHERE backend = ?1 AND share = ?2 AND path = ?3",
            (backend, share, path),
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Remove the record if present, insert it otherwise. Returns `true` when
    /// the record was added.
    pub fn toggle(&self, record: &FavouriteRecord) -> Result<bool, FavouritesError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let removed = tx.execute(
            "DELETE FROM favourites WHERE backend = ?1 AND share = ?2 AND path = ?3",
            (record.backend_id(), record.share_id(), record.path()),
        )?;
        if removed == 0 {
            insert(&tx, record)?;
        }
        tx.commit()?;
        Ok(removed == 0)
    }

    /// Records whose parent lies in `[lower, upper)`, ordered by path.
    pub fn list_by_parent_range(
        &self,
        backend: &str,
        share: &str,
        lower: &str,
        upper: &str,
    ) -> Result<Vec<FavouriteRecord>, FavouritesError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT backend, share, path FROM favourites
             WHERE backend = ?1 AND share = ?2 AND parent >= ?3 AND parent < ?4
             ORDER BY path",
        )?;
        let rows = stmt
            .query_map((backend, share, lower, upper), read_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn read_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<FavouriteRecord> {
    Ok(FavouriteRecord::new(
        row.get::<_, String>(0)?,
        row.get::<_, String>(1)?,
        row.get::<_, String>(2)?,
    ))
}

fn insert(conn: &Connection, record: &FavouriteRecord) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO favourites (backend, share, path, parent) VALUES (?1, ?2, ?3, ?4)",
        (
            record.backend_id(),
            record.share_id(),
            record.path(),
            record.parent_path(),
        ),
    )?;
    Ok(())
}

/// Create the schema when the database has no version yet.
fn upgrade(conn: &Connection) -> rusqlite::Result<()> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    if version >= SCHEMA_VERSION {
        return Ok(());
    }

    info!("Favourites DB: creating schema v{}", SCHEMA_VERSION);
    conn.execute_batch(&format!(
        "
        BEGIN;
        CREATE TABLE IF NOT EXISTS favourites (
            backend TEXT NOT NULL,
            share   TEXT NOT NULL,
            path    TEXT NOT NULL,
            parent  TEXT NOT NULL,
            PRIMARY KEY (backend, share, path)
        ) WITHOUT ROWID;

        CREATE INDEX IF NOT EXISTS favourites_parent
            ON favourites(backend, share, parent);

        PRAGMA user_version = {};
        COMMIT;
        ",
        SCHEMA_VERSION
    ))
}
