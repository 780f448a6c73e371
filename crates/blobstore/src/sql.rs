//! Embedded SQL blob backend
//!
//! One SQLite database per network with a single
//! `metadata_blobs(hash TEXT PRIMARY KEY, content TEXT)` table.
//! `INSERT OR IGNORE` gives per-fingerprint idempotency at the engine
//! level; the connection is funneled through a mutex, so writers are
//! serialized and readers see committed rows only.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use oaistore_core::{Result, StoreError};

use crate::hasher::ContentHasher;
use crate::store::MetadataStore;

/// SQLite-backed blob store for one network partition
pub struct SqlBlobStore {
    conn: Mutex<Connection>,
    hasher: Box<dyn ContentHasher>,
    batch_size: usize,
}

impl SqlBlobStore {
    /// Open (creating if needed) the database at the given path
    pub fn open(
        path: impl AsRef<Path>,
        hasher: Box<dyn ContentHasher>,
        batch_size: usize,
    ) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path.as_ref())
            .map_err(|e| StoreError::store_io_with_source("open sqlite blob store", e))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS metadata_blobs (
                 hash TEXT PRIMARY KEY,
                 content TEXT NOT NULL
             )",
        )
        .map_err(|e| StoreError::store_io_with_source("create metadata_blobs table", e))?;
        Ok(SqlBlobStore {
            conn: Mutex::new(conn),
            hasher,
            batch_size: batch_size.max(1),
        })
    }

    /// Store many payloads inside chunked transactions
    ///
    /// Chunk size is the configured `catalog.batch.size`. Returns the
    /// fingerprints in input order; duplicates within the input collapse to
    /// the same stored row.
    pub fn put_all(&self, contents: &[String]) -> Result<Vec<String>> {
        let mut hashes = Vec::with_capacity(contents.len());
        let mut conn = self.conn.lock();
        for chunk in contents.chunks(self.batch_size) {
            let tx = conn
                .transaction()
                .map_err(|e| StoreError::store_io_with_source("begin blob transaction", e))?;
            for content in chunk {
                let hash = self.hasher.fingerprint(content);
                tx.execute(
                    "INSERT OR IGNORE INTO metadata_blobs (hash, content) VALUES (?1, ?2)",
                    params![hash, content],
                )
                .map_err(|e| StoreError::store_io_with_source("insert metadata blob", e))?;
                hashes.push(hash);
            }
            tx.commit()
                .map_err(|e| StoreError::store_io_with_source("commit blob transaction", e))?;
        }
        Ok(hashes)
    }
}

impl MetadataStore for SqlBlobStore {
    fn put(&self, content: &str) -> Result<String> {
        let hash = self.hasher.fingerprint(content);
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR IGNORE INTO metadata_blobs (hash, content) VALUES (?1, ?2)",
            params![hash, content],
        )
        .map_err(|e| StoreError::store_io_with_source("insert metadata blob", e))?;
        Ok(hash)
    }

    fn get(&self, hash: &str) -> Result<String> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT content FROM metadata_blobs WHERE hash = ?1",
            params![hash],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|e| StoreError::store_io_with_source("read metadata blob", e))?
        .ok_or_else(|| StoreError::not_found(format!("metadata blob {}", hash)))
    }

    fn delete(&self, hash: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let affected = conn
            .execute("DELETE FROM metadata_blobs WHERE hash = ?1", params![hash])
            .map_err(|e| StoreError::store_io_with_source("delete metadata blob", e))?;
        Ok(affected > 0)
    }

    fn for_each_hash(&self, consumer: &mut dyn FnMut(&str)) -> Result<()> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT hash FROM metadata_blobs")
            .map_err(|e| StoreError::store_io_with_source("list metadata blobs", e))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| StoreError::store_io_with_source("list metadata blobs", e))?;
        for row in rows {
            let hash = row.map_err(|e| StoreError::store_io_with_source("read blob row", e))?;
            consumer(&hash);
        }
        Ok(())
    }

    fn clean_and_optimize(&self) -> Result<bool> {
        let conn = self.conn.lock();
        conn.execute_batch("VACUUM")
            .map_err(|e| StoreError::store_io_with_source("vacuum blob store", e))?;
        debug!("vacuumed sql blob store");
        Ok(true)
    }
}
