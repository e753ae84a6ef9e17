//! Exact flat vector index.
//!
//! # Storage Format
//!
//! The index is a little-endian binary file:
//! - Header (16 bytes): magic `MRIX`, version, dimension, vector count
//! - Vectors: `count * dimension` contiguous f32 values
//!
//! Row ids live next to it in a JSON array of strings, one per row.

use super::{score, SearchResult, VectorStore};
use crate::config::DistanceMetric;
use crate::error::{MedragError, Result};
use async_trait::async_trait;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Magic bytes identifying index files.
const MAGIC_BYTES: &[u8; 4] = b"MRIX";

/// Current storage format version.
const STORAGE_VERSION: u32 = 1;

/// Size of the storage header in bytes.
const HEADER_SIZE: usize = 16;

const BYTES_PER_F32: usize = 4;

/// In-memory flat index searched by exhaustive scan.
#[derive(Debug, Clone)]
pub struct FlatVectorStore {
    dimensions: usize,
    metric: DistanceMetric,
    /// Row-major `len * dimensions` matrix.
    vectors: Vec<f32>,
    ids: Vec<String>,
}

impl FlatVectorStore {
    /// Create an empty index.
    pub fn new(dimensions: usize, metric: DistanceMetric) -> Self {
        Self {
            dimensions,
            metric,
            vectors: Vec::new(),
            ids: Vec::new(),
        }
    }

    /// Append a row.
    pub fn push(&mut self, doc_id: &str, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimensions {
            return Err(MedragError::Index(format!(
                "vector for {} has {} dimensions, index has {}",
                doc_id,
                vector.len(),
                self.dimensions
            )));
        }
        self.vectors.extend_from_slice(vector);
        self.ids.push(doc_id.to_string());
        Ok(())
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Vector stored at a row.
    pub fn vector(&self, row: usize) -> Option<&[f32]> {
        let start = row.checked_mul(self.dimensions)?;
        let end = start.checked_add(self.dimensions)?;
        self.vectors.get(start..end)
    }

    /// Load an index file and its id map.
    pub fn load(path: &Path, ids_path: &Path, metric: DistanceMetric) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            MedragError::Index(format!("failed to read index {}: {}", path.display(), e))
        })?;
        let (dimensions, vectors) = decode(&bytes)
            .map_err(|e| MedragError::Index(format!("{}: {}", path.display(), e)))?;

        let ids_raw = std::fs::read_to_string(ids_path).map_err(|e| {
            MedragError::Index(format!("failed to read id map {}: {}", ids_path.display(), e))
        })?;
        let ids: Vec<String> = serde_json::from_str(&ids_raw)?;

        let count = if dimensions == 0 { 0 } else { vectors.len() / dimensions };
        if ids.len() != count {
            return Err(MedragError::Index(format!(
                "id map {} has {} entries but index has {} rows",
                ids_path.display(),
                ids.len(),
                count
            )));
        }

        debug!("Loaded flat index: {} rows x {} dims", count, dimensions);

        Ok(Self {
            dimensions,
            metric,
            vectors,
            ids,
        })
    }

    /// Write the index file and id map, each replaced atomically.
    pub fn save(&self, path: &Path, ids_path: &Path) -> Result<()> {
        let dimensions = header_field("dimensions", self.dimensions)?;
        let count = header_field("row count", self.ids.len())?;

        let mut buf = Vec::with_capacity(HEADER_SIZE + self.vectors.len() * BYTES_PER_F32);
        buf.extend_from_slice(MAGIC_BYTES);
        buf.extend_from_slice(&STORAGE_VERSION.to_le_bytes());
        buf.extend_from_slice(&dimensions.to_le_bytes());
        buf.extend_from_slice(&count.to_le_bytes());
        for value in &self.vectors {
            buf.extend_from_slice(&value.to_le_bytes());
        }

        write_atomic(path, &buf)?;
        write_atomic(ids_path, &serde_json::to_vec_pretty(&self.ids)?)?;
        Ok(())
    }
}

fn header_field(name: &str, value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| {
        MedragError::Index(format!("{} {} does not fit the index header", name, value))
    })
}

fn decode(bytes: &[u8]) -> std::result::Result<(usize, Vec<f32>), String> {
    if bytes.len() < HEADER_SIZE {
        return Err("file too small for header".to_string());
    }
    if &bytes[0..4] != MAGIC_BYTES {
        return Err("not a medrag index (bad magic)".to_string());
    }

    let read_u32 = |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
    let version = read_u32(4);
    if version != STORAGE_VERSION {
        return Err(format!("unsupported index version {}", version));
    }
    let dimensions = read_u32(8) as usize;
    let count = read_u32(12) as usize;

    let expected = count
        .checked_mul(dimensions)
        .and_then(|n| n.checked_mul(BYTES_PER_F32))
        .ok_or_else(|| "header sizes overflow".to_string())?;
    let body = &bytes[HEADER_SIZE..];
    if body.len() != expected {
        return Err(format!(
            "expected {} bytes of vectors for {} x {}, found {}",
            expected,
            count,
            dimensions,
            body.len()
        ));
    }

    let vectors = body
        .chunks_exact(BYTES_PER_F32)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    Ok((dimensions, vectors))
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| MedragError::Io(e.error))?;
    Ok(())
}

#[async_trait]
impl VectorStore for FlatVectorStore {
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        if query_embedding.len() != self.dimensions {
            return Err(MedragError::Index(format!(
                "query has {} dimensions, index has {}",
                query_embedding.len(),
                self.dimensions
            )));
        }
        if limit == 0 || self.ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .chunks_exact(self.dimensions)
            .enumerate()
            .map(|(row, stored)| (row, score(self.metric, query_embedding, stored)))
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(limit);

        Ok(scored
            .into_iter()
            .map(|(row, score)| SearchResult {
                row,
                doc_id: self.ids[row].clone(),
                score,
            })
            .collect())
    }

    fn ids(&self) -> &[String] {
        &self.ids
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FlatVectorStore {
        let mut index = FlatVectorStore::new(3, DistanceMetric::Cosine);
        index.push("d1", &[1.0, 0.1, 0.0]).unwrap();
        index.push("d2", &[0.9, 0.3, 0.0]).unwrap();
        index.push("d3", &[0.0, 0.0, 1.0]).unwrap();
        index
    }

    #[tokio::test]
    async fn test_search_orders_by_similarity() {
        let index = sample();

        let results = index.search(&[1.0, 0.0, 0.0], 2).await.unwrap();
        let ids: Vec<_> = results.iter().map(|r| r.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["d1", "d2"]);
        assert!(results[0].score >= results[1].score);
        assert_eq!(results[0].row, 0);
    }

    #[tokio::test]
    async fn test_search_limit_bounds_results() {
        let index = sample();
        assert_eq!(index.search(&[1.0, 0.0, 0.0], 10).await.unwrap().len(), 3);
        assert!(index.search(&[1.0, 0.0, 0.0], 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ties_break_by_row() {
        let mut index = FlatVectorStore::new(2, DistanceMetric::Cosine);
        index.push("b", &[1.0, 0.0]).unwrap();
        index.push("a", &[2.0, 0.0]).unwrap();
        index.push("c", &[0.0, 1.0]).unwrap();

        for _ in 0..3 {
            let results = index.search(&[1.0, 0.0], 2).await.unwrap();
            assert_eq!(results[0].doc_id, "b");
            assert_eq!(results[1].doc_id, "a");
        }
    }

    #[tokio::test]
    async fn test_dimension_mismatch() {
        let index = sample();
        let err = index.search(&[1.0, 0.0], 1).await.unwrap_err();
        assert!(matches!(err, MedragError::Index(_)));

        let mut index = sample();
        assert!(index.push("d4", &[1.0]).is_err());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.bin");
        let ids_path = dir.path().join("index_ids.json");

        let index = sample();
        index.save(&path, &ids_path).unwrap();

        let loaded = FlatVectorStore::load(&path, &ids_path, DistanceMetric::Cosine).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.dimensions(), 3);
        assert_eq!(loaded.ids(), index.ids());
        assert_eq!(loaded.vector(1), Some(&[0.9f32, 0.3, 0.0][..]));
        assert_eq!(loaded.vector(3), None);

        let results = loaded.search(&[0.0, 0.0, 1.0], 1).await.unwrap();
        assert_eq!(results[0].doc_id, "d3");
    }

    #[test]
    fn test_load_rejects_mismatched_id_map() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.bin");
        let ids_path = dir.path().join("index_ids.json");

        sample().save(&path, &ids_path).unwrap();
        std::fs::write(&ids_path, r#"["d1", "d2"]"#).unwrap();

        let err = FlatVectorStore::load(&path, &ids_path, DistanceMetric::Cosine).unwrap_err();
        assert!(err.to_string().contains("2 entries"));
    }

    #[test]
    fn test_load_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.bin");
        let ids_path = dir.path().join("index_ids.json");
        std::fs::write(&ids_path, "[]").unwrap();

        std::fs::write(&path, b"NOPE").unwrap();
        assert!(FlatVectorStore::load(&path, &ids_path, DistanceMetric::Cosine).is_err());

        let mut bytes = Vec::new();
        bytes.extend_from_slice(MAGIC_BYTES);
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&1.0f32.to_le_bytes());
        std::fs::write(&path, &bytes).unwrap();
        let err = FlatVectorStore::load(&path, &ids_path, DistanceMetric::Cosine).unwrap_err();
        assert!(err.to_string().contains("expected 8 bytes"));
    }

    #[test]
    fn test_vector_rejects_overflowing_rows() {
        let index = sample();
        assert_eq!(index.vector(2), Some(&[0.0, 0.0, 1.0][..]));
        assert_eq!(index.vector(usize::MAX), None);
        assert_eq!(index.vector(usize::MAX / 3), None);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_save_rejects_dimensions_beyond_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.bin");
        let ids_path = dir.path().join("index_ids.json");

        let index = FlatVectorStore::new(u32::MAX as usize + 1, DistanceMetric::Cosine);
        let err = index.save(&path, &ids_path).unwrap_err();
        assert!(matches!(err, MedragError::Index(_)));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_l2_metric() {
        let mut index = FlatVectorStore::new(2, DistanceMetric::L2);
        index.push("far", &[10.0, 10.0]).unwrap();
        index.push("near", &[1.0, 1.0]).unwrap();

        let results = index.search(&[0.0, 0.0], 2).await.unwrap();
        assert_eq!(results[0].doc_id, "near");
        assert_eq!(index.metric(), DistanceMetric::L2);
    }
}
