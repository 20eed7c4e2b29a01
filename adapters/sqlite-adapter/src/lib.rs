//! sqlite-adapter — SQLite implementation of the `LinkStore` port.
//!
//! Purpose
//! - Provide a file-based store so links survive restarts without running a
//!   separate database server.
//! - Implements the `LinkStore` trait from the `domain` crate.
//!
//! Notes
//! - Uses `rusqlite` with the `bundled` feature for portability.
//! - `short` is the primary key and `full` carries a UNIQUE constraint; both
//!   uniqueness invariants are enforced by the database, not by callers.
//! - Click increments are a single `UPDATE ... RETURNING` statement.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use domain::{CoreError, Link, LinkStore, ShortCode, Upsert};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

/// SQLite-backed link store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a SQLite database at the given path and ensure schema.
    /// Missing parent directories are created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .map_err(|e| CoreError::Store(format!("create {}: {e}", dir.display())))?;
        }
        let conn = Connection::open(path).map_err(map_sqerr)?;
        init_schema(&conn)?;
        debug!(path = %path.display(), "sqlite store opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Close the underlying connection, surfacing any error SQLite reports
    /// while finalizing.
    pub fn close(self) -> Result<(), CoreError> {
        let conn = self
            .conn
            .into_inner()
            .map_err(|_| CoreError::Store("mutex poisoned".into()))?;
        conn.close().map_err(|(_, e)| map_sqerr(e))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, CoreError> {
        self.conn
            .lock()
            .map_err(|_| CoreError::Store("mutex poisoned".into()))
    }
}

fn init_schema(conn: &Connection) -> Result<(), CoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS links (
            short TEXT PRIMARY KEY,
            full TEXT NOT NULL UNIQUE,
            clicks INTEGER NOT NULL DEFAULT 0
        );
        "#,
    )
    .map_err(map_sqerr)
}

fn map_sqerr<E: std::fmt::Display>(e: E) -> CoreError {
    CoreError::Store(format!("sqlite error: {e}"))
}

/// Translate uniqueness violations into the domain's conflict errors.
fn map_write_err(e: rusqlite::Error) -> CoreError {
    if let rusqlite::Error::SqliteFailure(err, msg) = &e {
        if err.code == rusqlite::ErrorCode::ConstraintViolation {
            let msg = msg.as_deref().unwrap_or_default();
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                || msg.contains("links.short")
            {
                return CoreError::CodeTaken;
            }
            if msg.contains("links.full") {
                return CoreError::UrlTaken;
            }
        }
    }
    map_sqerr(e)
}

fn row_to_link(row: &rusqlite::Row) -> rusqlite::Result<(String, String, i64)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn into_link((full, short, clicks): (String, String, i64)) -> Result<Link, CoreError> {
    let short = ShortCode::parse(short.as_str())
        .ok_or_else(|| CoreError::Store(format!("bad short code in db: {short:?}")))?;
    Ok(Link {
        full,
        short,
        clicks: clicks.max(0) as u64,
    })
}

fn select_by_url(conn: &Connection, full: &str) -> Result<Option<Link>, CoreError> {
    conn.query_row(
        "SELECT full, short, clicks FROM links WHERE full = ?1",
        params![full],
        row_to_link,
    )
    .optional()
    .map_err(map_sqerr)?
    .map(into_link)
    .transpose()
}

impl LinkStore for SqliteStore {
    fn find_by_url(&self, full: &str) -> Result<Option<Link>, CoreError> {
        let conn = self.lock()?;
        select_by_url(&conn, full)
    }

    fn find_by_code(&self, short: &ShortCode) -> Result<Option<Link>, CoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT full, short, clicks FROM links WHERE short = ?1",
            params![short.as_str()],
            row_to_link,
        )
        .optional()
        .map_err(map_sqerr)?
        .map(into_link)
        .transpose()
    }

    fn insert(&self, full: &str, short: &ShortCode) -> Result<Link, CoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO links(short, full, clicks) VALUES (?1, ?2, 0)",
            params![short.as_str(), full],
        )
        .map_err(map_write_err)?;
        Ok(Link::new(full.to_string(), short.clone()))
    }

    fn insert_if_absent(&self, full: &str, short: &ShortCode) -> Result<Upsert, CoreError> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction().map_err(map_sqerr)?;
        // A clash on `short` is not covered by the conflict target and still errors.
        let changed = tx
            .execute(
                "INSERT INTO links(short, full, clicks) VALUES (?1, ?2, 0) ON CONFLICT(full) DO NOTHING",
                params![short.as_str(), full],
            )
            .map_err(map_write_err)?;
        let out = if changed == 1 {
            Upsert::Inserted(Link::new(full.to_string(), short.clone()))
        } else {
            let existing = select_by_url(&tx, full)?
                .ok_or_else(|| CoreError::Store("conflicting row vanished".into()))?;
            Upsert::Existing(existing)
        };
        tx.commit().map_err(map_sqerr)?;
        Ok(out)
    }

    fn increment_clicks(&self, short: &ShortCode) -> Result<Option<Link>, CoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "UPDATE links SET clicks = clicks + 1 WHERE short = ?1 RETURNING full, short, clicks",
            params![short.as_str()],
            row_to_link,
        )
        .optional()
        .map_err(map_sqerr)?
        .map(into_link)
        .transpose()
    }
}
