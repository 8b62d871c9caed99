//! Persistent flat-L2 vector store.
//!
//! The store owns two co-located artifacts under its storage directory:
//! `metadata.json` (the ordered list of source texts, UTF-8 JSON) and
//! `vectors.bin` (a headered blob of little-endian f64 vectors). The
//! invariant `vectors.len() == texts.len()` is checked on load and upheld
//! by every mutation; a mismatch on disk is reported as
//! [`StoreError::Corrupt`], never repaired silently.
//!
//! Both files are written via temp-file + atomic rename so a crash cannot
//! leave a torn file. A failure between the two renames can still leave
//! the pair inconsistent on disk, and a persistence failure leaves the
//! in-memory state ahead of disk; both are reported, not rolled back.
//!
//! Single-writer by construction: all mutations take `&mut self`, and the
//! CLI opens exactly one store per process.

use std::path::{Path, PathBuf};

use crate::embedding::{blob_to_vec, l2_distance_sq, vec_to_blob, Embedder};
use crate::error::StoreError;

/// Fixed dimensionality of every stored vector.
pub const EMBEDDING_DIM: usize = 384;

const METADATA_FILE: &str = "metadata.json";
const INDEX_FILE: &str = "vectors.bin";

/// Index file header: magic, format version, dimension (u32), count (u64).
const INDEX_MAGIC: &[u8; 4] = b"LLVX";
const INDEX_VERSION: u32 = 1;

/// Store statistics, as reported by `loglens stats`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    pub total_records: usize,
    pub dimension: usize,
    pub path: PathBuf,
}

/// Append-only (until an explicit clear) nearest-neighbor store over a
/// flat L2 index.
#[derive(Debug)]
pub struct VectorStore {
    dir: PathBuf,
    dimension: usize,
    vectors: Vec<Vec<f64>>,
    texts: Vec<String>,
}

impl VectorStore {
    /// Open the store at `dir`, creating the directory if needed and
    /// loading any persisted state.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir)?;

        let texts = load_metadata(&dir.join(METADATA_FILE))?;
        let vectors = load_index(&dir.join(INDEX_FILE))?;

        if vectors.len() != texts.len() {
            return Err(StoreError::Corrupt {
                vectors: vectors.len(),
                texts: texts.len(),
            });
        }

        tracing::debug!(records = texts.len(), dir = %dir.display(), "vector store opened");

        Ok(Self {
            dir: dir.to_path_buf(),
            dimension: EMBEDDING_DIM,
            vectors,
            texts,
        })
    }

    /// Embed `text` and append the (vector, text) pair, persisting both
    /// artifacts. On failure the in-memory state may be ahead of disk.
    pub async fn add(&mut self, embedder: &dyn Embedder, text: &str) -> Result<(), StoreError> {
        let vector = embedder.embed(text).await?;
        if vector.len() != self.dimension {
            return Err(StoreError::Dimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        self.vectors.push(vector);
        self.texts.push(text.to_string());
        debug_assert_eq!(self.vectors.len(), self.texts.len());

        self.persist()
    }

    /// Up to `k` stored texts ordered by ascending squared L2 distance to
    /// `query`, ties broken by insertion order. Never fails: an empty
    /// store or a mismatched query yields an empty result.
    pub fn search(&self, query: &[f64], k: usize) -> Vec<String> {
        if self.vectors.is_empty() || k == 0 {
            return Vec::new();
        }
        if query.len() != self.dimension {
            tracing::warn!(
                expected = self.dimension,
                actual = query.len(),
                "query vector has wrong dimension"
            );
            return Vec::new();
        }

        let mut ranked: Vec<(f64, usize)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (l2_distance_sq(query, v), i))
            .collect();
        ranked.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });

        ranked
            .into_iter()
            .take(k)
            .map(|(_, i)| self.texts[i].clone())
            .collect()
    }

    /// Reset the store to empty and persist both artifacts.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.vectors.clear();
        self.texts.clear();
        self.persist()
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            total_records: self.texts.len(),
            dimension: self.dimension,
            path: self.dir.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    fn persist(&self) -> Result<(), StoreError> {
        write_atomic(
            &self.dir.join(METADATA_FILE),
            &serde_json::to_vec_pretty(&self.texts)?,
        )?;
        write_atomic(&self.dir.join(INDEX_FILE), &encode_index(&self.vectors))?;
        Ok(())
    }
}

fn load_metadata(path: &Path) -> Result<Vec<String>, StoreError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn encode_index(vectors: &[Vec<f64>]) -> Vec<u8> {
    let mut out = Vec::with_capacity(20 + vectors.len() * EMBEDDING_DIM * 8);
    out.extend_from_slice(INDEX_MAGIC);
    out.extend_from_slice(&INDEX_VERSION.to_le_bytes());
    out.extend_from_slice(&(EMBEDDING_DIM as u32).to_le_bytes());
    out.extend_from_slice(&(vectors.len() as u64).to_le_bytes());
    for vector in vectors {
        out.extend_from_slice(&vec_to_blob(vector));
    }
    out
}

fn load_index(path: &Path) -> Result<Vec<Vec<f64>>, StoreError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let bytes = std::fs::read(path)?;

    if bytes.len() < 20 {
        return Err(StoreError::IndexFormat("truncated header".to_string()));
    }
    if &bytes[0..4] != INDEX_MAGIC {
        return Err(StoreError::IndexFormat("bad magic".to_string()));
    }
    let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version != INDEX_VERSION {
        return Err(StoreError::IndexFormat(format!(
            "unsupported version {}",
            version
        )));
    }
    let dimension = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
    if dimension != EMBEDDING_DIM {
        return Err(StoreError::IndexFormat(format!(
            "dimension {} does not match store dimension {}",
            dimension, EMBEDDING_DIM
        )));
    }
    let count = u64::from_le_bytes([
        bytes[12], bytes[13], bytes[14], bytes[15], bytes[16], bytes[17], bytes[18], bytes[19],
    ]) as usize;

    let data = &bytes[20..];
    let expected = count * dimension * 8;
    if data.len() != expected {
        return Err(StoreError::IndexFormat(format!(
            "expected {} data bytes for {} vectors, found {}",
            expected,
            count,
            data.len()
        )));
    }

    Ok(data
        .chunks_exact(dimension * 8)
        .map(blob_to_vec)
        .collect())
}

/// Write via temp file + rename so readers never observe a torn file.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
