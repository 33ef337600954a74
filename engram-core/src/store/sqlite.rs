use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{Connection, params};

use super::{ConfigSnapshot, EmbeddingStore, StoreError, StoredEmbedding, validate_vector};

/// SQLite-backed embedding store.
///
/// Stores vectors as little-endian `f32` blobs alongside their opaque text
/// payloads. The config table lives in the same database and is seeded
/// insert-if-absent.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and run migrations.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| {
            StoreError::Storage(format!("failed to open database '{}': {e}", path.display()))
        })?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing).
    ///
    /// This is a test helper and should not be used in production code.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Storage(format!("failed to open in-memory database: {e}")))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Run schema migrations idempotently.
    fn migrate(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;

            CREATE TABLE IF NOT EXISTS config (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS embeddings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                vector BLOB NOT NULL,
                payload TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            ",
        )
        .map_err(|e| StoreError::Storage(format!("migration failed: {e}")))?;
        Ok(())
    }
}

/// Encode a vector as a little-endian byte blob.
fn vector_to_bytes(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for &v in vector {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a little-endian byte blob back into `Vec<f32>`.
fn bytes_to_vector(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

impl EmbeddingStore for SqliteStore {
    fn store(&self, vector: &[f32], payload: &str) -> Result<i64, StoreError> {
        validate_vector(vector)?;

        let conn = self.conn.lock().unwrap();
        let blob = vector_to_bytes(vector);
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO embeddings (vector, payload, created_at) VALUES (?1, ?2, ?3)",
            params![blob, payload, now],
        )
        .map_err(|e| StoreError::Storage(format!("failed to store embedding: {e}")))?;

        Ok(conn.last_insert_rowid())
    }

    fn all_embeddings(&self) -> Result<Vec<StoredEmbedding>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT vector, payload FROM embeddings ORDER BY id")
            .map_err(|e| StoreError::Storage(format!("failed to prepare scan: {e}")))?;

        let rows = stmt
            .query_map([], |row| {
                let blob: Vec<u8> = row.get(0)?;
                let payload: String = row.get(1)?;
                Ok((blob, payload))
            })
            .map_err(|e| StoreError::Storage(format!("scan query failed: {e}")))?;

        let mut entries = Vec::new();
        for row in rows {
            let (blob, payload) =
                row.map_err(|e| StoreError::Storage(format!("failed to read row: {e}")))?;
            entries.push(StoredEmbedding {
                vector: bytes_to_vector(&blob),
                payload,
            });
        }
        Ok(entries)
    }

    fn count(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM embeddings", [], |row| row.get(0))
            .map_err(|e| StoreError::Storage(format!("failed to count embeddings: {e}")))
    }

    fn seed_config(&self, defaults: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("INSERT OR IGNORE INTO config (key, value) VALUES (?1, ?2)")
            .map_err(|e| StoreError::Storage(format!("failed to prepare seed: {e}")))?;
        for (key, value) in defaults {
            stmt.execute(params![key, value])
                .map_err(|e| StoreError::Storage(format!("failed to seed config '{key}': {e}")))?;
        }
        Ok(())
    }

    fn config_snapshot(&self) -> Result<ConfigSnapshot, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT key, value FROM config")
            .map_err(|e| StoreError::Storage(format!("failed to prepare config read: {e}")))?;

        let rows = stmt
            .query_map([], |row| {
                let key: String = row.get(0)?;
                let value: String = row.get(1)?;
                Ok((key, value))
            })
            .map_err(|e| StoreError::Storage(format!("config query failed: {e}")))?;

        let mut values = BTreeMap::new();
        for row in rows {
            let (key, value) =
                row.map_err(|e| StoreError::Storage(format!("failed to read config row: {e}")))?;
            values.insert(key, value);
        }

        let size: usize = conn
            .query_row("SELECT COUNT(*) FROM embeddings", [], |row| row.get(0))
            .map_err(|e| StoreError::Storage(format!("failed to count embeddings: {e}")))?;

        Ok(ConfigSnapshot { values, size })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn test_store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    fn seed_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn temp_db_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("engram-test-{name}-{}.db", std::process::id()))
    }

    #[test]
    fn store_assigns_increasing_ids() {
        let store = test_store();
        let id1 = store.store(&[1.0, 0.0], "first").unwrap();
        let id2 = store.store(&[0.0, 1.0], "second").unwrap();
        let id3 = store.store(&[1.0, 1.0], "third").unwrap();
        assert!(id1 < id2 && id2 < id3, "ids should increase: {id1}, {id2}, {id3}");
    }

    #[test]
    fn vectors_round_trip_exactly() {
        let store = test_store();
        let vector = vec![0.1, -2.5, f32::MIN_POSITIVE, 1e30, 0.0];
        store.store(&vector, "payload").unwrap();

        let entries = store.all_embeddings().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].vector, vector);
        assert_eq!(entries[0].payload, "payload");
    }

    #[test]
    fn scan_preserves_insertion_order() {
        let store = test_store();
        store.store(&[1.0], "a").unwrap();
        store.store(&[2.0], "b").unwrap();
        store.store(&[3.0], "c").unwrap();

        let payloads: Vec<String> = store
            .all_embeddings()
            .unwrap()
            .into_iter()
            .map(|e| e.payload)
            .collect();
        assert_eq!(payloads, vec!["a", "b", "c"]);
    }

    #[test]
    fn heterogeneous_dimensions_are_accepted_at_write_time() {
        let store = test_store();
        store.store(&[1.0, 0.0, 0.0], "three").unwrap();
        store.store(&[1.0, 0.0, 0.0, 0.0, 0.0], "five").unwrap();

        let entries = store.all_embeddings().unwrap();
        assert_eq!(entries[0].vector.len(), 3);
        assert_eq!(entries[1].vector.len(), 5);
    }

    #[test]
    fn empty_vector_is_rejected() {
        let store = test_store();
        let err = store.store(&[], "nope").unwrap_err();
        assert!(matches!(err, StoreError::InvalidVector(_)));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn non_finite_vector_is_rejected() {
        let store = test_store();
        let err = store.store(&[1.0, f32::NAN], "nope").unwrap_err();
        assert!(matches!(err, StoreError::InvalidVector(_)));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn count_tracks_stores() {
        let store = test_store();
        assert_eq!(store.count().unwrap(), 0);
        store.store(&[1.0], "a").unwrap();
        store.store(&[2.0], "b").unwrap();
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn seeding_is_insert_if_absent() {
        let store = test_store();
        store
            .seed_config(&seed_map(&[("prompt", "original"), ("embedding", "model-a")]))
            .unwrap();

        // A second seed run must not overwrite existing values.
        store
            .seed_config(&seed_map(&[("prompt", "changed"), ("embedding", "model-b")]))
            .unwrap();

        let snapshot = store.config_snapshot().unwrap();
        assert_eq!(snapshot.values["prompt"], "original");
        assert_eq!(snapshot.values["embedding"], "model-a");
    }

    #[test]
    fn snapshot_merges_computed_size() {
        let store = test_store();
        store.seed_config(&seed_map(&[("prompt", "hi")])).unwrap();
        assert_eq!(store.config_snapshot().unwrap().size, 0);

        store.store(&[1.0, 0.0], "a").unwrap();
        store.store(&[0.0, 1.0], "b").unwrap();

        let snapshot = store.config_snapshot().unwrap();
        assert_eq!(snapshot.size, 2);
        assert_eq!(snapshot.values["prompt"], "hi");
        // Size is computed, never a config row.
        assert!(!snapshot.values.contains_key("size"));
    }

    #[test]
    fn data_survives_store_reopen() {
        let path = temp_db_path("reopen");
        let _ = std::fs::remove_file(&path);

        {
            let store = SqliteStore::open(&path).unwrap();
            store.seed_config(&seed_map(&[("prompt", "kept")])).unwrap();
            store.store(&[0.5, 0.5], "persisted").unwrap();
        }
        // Store dropped — simulating restart.

        {
            let store = SqliteStore::open(&path).unwrap();
            let entries = store.all_embeddings().unwrap();
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].payload, "persisted");
            assert_eq!(entries[0].vector, vec![0.5, 0.5]);

            let snapshot = store.config_snapshot().unwrap();
            assert_eq!(snapshot.values["prompt"], "kept");
            assert_eq!(snapshot.size, 1);
        }

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn migrations_are_idempotent() {
        let path = temp_db_path("idempotent");
        let _ = std::fs::remove_file(&path);

        {
            let _store = SqliteStore::open(&path).unwrap();
        }
        // Open again — migrations should not fail or drop anything.
        {
            let store = SqliteStore::open(&path).unwrap();
            assert_eq!(store.count().unwrap(), 0);
        }

        std::fs::remove_file(&path).ok();
    }
}
