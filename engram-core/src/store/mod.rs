pub mod sqlite;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur during store operations.
#[derive(Debug)]
pub enum StoreError {
    /// The supplied vector is unusable (empty, or contains a non-finite element).
    InvalidVector(String),
    /// A general storage failure (I/O, SQL, etc.).
    Storage(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidVector(msg) => write!(f, "invalid vector: {msg}"),
            Self::Storage(msg) => write!(f, "storage error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// A stored (vector, payload) pair as returned by a full scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEmbedding {
    pub vector: Vec<f32>,
    pub payload: String,
}

/// The config table contents merged with the computed store size.
///
/// `size` is derived from the embeddings count at read time; it is never a
/// stored row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    #[serde(flatten)]
    pub values: BTreeMap<String, String>,
    pub size: usize,
}

/// Reject vectors the ranker cannot work with.
///
/// Dimension is deliberately NOT checked here: records of differing
/// dimensions may coexist, and incompatibility is resolved per record at
/// query time.
pub fn validate_vector(vector: &[f32]) -> Result<(), StoreError> {
    if vector.is_empty() {
        return Err(StoreError::InvalidVector("vector must not be empty".into()));
    }
    if let Some(pos) = vector.iter().position(|v| !v.is_finite()) {
        return Err(StoreError::InvalidVector(format!(
            "element at index {pos} is not a finite number"
        )));
    }
    Ok(())
}

/// Trait abstracting embedding persistence and config metadata.
///
/// Records are append-only: there is no update or delete. Implementations
/// must make each `store` call atomic — a record is either fully visible to
/// subsequent reads or not visible at all.
pub trait EmbeddingStore: Send + Sync {
    /// Append one immutable record and return its assigned id.
    fn store(&self, vector: &[f32], payload: &str) -> Result<i64, StoreError>;

    /// Return every stored (vector, payload) pair in insertion order.
    fn all_embeddings(&self) -> Result<Vec<StoredEmbedding>, StoreError>;

    /// Number of stored records.
    fn count(&self) -> Result<usize, StoreError>;

    /// Insert config defaults for keys not already present. Idempotent.
    fn seed_config(&self, defaults: &BTreeMap<String, String>) -> Result<(), StoreError>;

    /// All config pairs merged with the current store size.
    fn config_snapshot(&self) -> Result<ConfigSnapshot, StoreError>;
}
