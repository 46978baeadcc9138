//! Persisted vector index over embedded document chunks.
//!
//! An index lives in a directory of three files:
//!
//! | File | Contents |
//! |------|----------|
//! | `manifest.json` | embedding model, dimensionality, chunk count |
//! | `chunks.json` | array of [`DocumentChunk`]s, in vector order |
//! | `vectors.bin` | `count × dims` little-endian `f32` values |
//!
//! Loading checks that the three files agree on sizes; their contents are
//! otherwise trusted. Search is brute-force cosine similarity, which is
//! plenty for a remedies corpus of a few thousand chunks.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::models::DocumentChunk;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const CHUNKS_FILE: &str = "chunks.json";
pub const VECTORS_FILE: &str = "vectors.bin";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub model: String,
    pub dims: usize,
    pub count: usize,
    #[serde(default)]
    pub created_at: String,
}

/// A chunk paired with its similarity to the query.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    pub score: f32,
}

#[derive(Debug, Clone)]
pub struct VectorIndex {
    model: String,
    dims: usize,
    chunks: Vec<DocumentChunk>,
    vectors: Vec<Vec<f32>>,
}

impl VectorIndex {
    pub fn new(model: impl Into<String>, dims: usize) -> Self {
        Self {
            model: model.into(),
            dims,
            chunks: Vec::new(),
            vectors: Vec::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunks(&self) -> &[DocumentChunk] {
        &self.chunks
    }

    pub fn manifest(&self) -> IndexManifest {
        IndexManifest {
            model: self.model.clone(),
            dims: self.dims,
            count: self.chunks.len(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn push(&mut self, chunk: DocumentChunk, vector: Vec<f32>) -> Result<()> {
        if vector.len() != self.dims {
            bail!(
                "vector for chunk {} has {} dims, index expects {}",
                chunk.id,
                vector.len(),
                self.dims
            );
        }
        self.chunks.push(chunk);
        self.vectors.push(vector);
        Ok(())
    }

    /// Return up to `k` chunks ordered by descending cosine similarity.
    ///
    /// Ties keep index order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if query.len() != self.dims {
            bail!(
                "query vector has {} dims, index expects {}",
                query.len(),
                self.dims
            );
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| {
                // NaN scores (non-finite stored vectors) rank last.
                let score = cosine_similarity(query, v);
                (i, if score.is_nan() { f32::NEG_INFINITY } else { score })
            })
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| ScoredChunk {
                chunk: self.chunks[i].clone(),
                score,
            })
            .collect())
    }

    pub fn load(dir: &Path) -> Result<Self> {
        let manifest_path = dir.join(MANIFEST_FILE);
        let manifest: IndexManifest = serde_json::from_slice(
            &std::fs::read(&manifest_path)
                .with_context(|| format!("Failed to read {}", manifest_path.display()))?,
        )
        .with_context(|| format!("Failed to parse {}", manifest_path.display()))?;

        let chunks_path = dir.join(CHUNKS_FILE);
        let chunks: Vec<DocumentChunk> = serde_json::from_slice(
            &std::fs::read(&chunks_path)
                .with_context(|| format!("Failed to read {}", chunks_path.display()))?,
        )
        .with_context(|| format!("Failed to parse {}", chunks_path.display()))?;

        let vectors_path = dir.join(VECTORS_FILE);
        let blob = std::fs::read(&vectors_path)
            .with_context(|| format!("Failed to read {}", vectors_path.display()))?;

        if manifest.dims == 0 {
            bail!("index manifest declares zero dimensions");
        }
        if chunks.len() != manifest.count {
            bail!(
                "index manifest declares {} chunks but {} has {}",
                manifest.count,
                CHUNKS_FILE,
                chunks.len()
            );
        }
        let expected = manifest.count * manifest.dims * 4;
        if blob.len() != expected {
            bail!(
                "{} is {} bytes, expected {} ({} × {} f32)",
                VECTORS_FILE,
                blob.len(),
                expected,
                manifest.count,
                manifest.dims
            );
        }

        let vectors = blob
            .chunks_exact(manifest.dims * 4)
            .map(blob_to_vec)
            .collect();

        tracing::debug!(
            dir = %dir.display(),
            model = %manifest.model,
            count = manifest.count,
            "loaded vector index"
        );

        Ok(Self {
            model: manifest.model,
            dims: manifest.dims,
            chunks,
            vectors,
        })
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create index directory {}", dir.display()))?;

        let mut blob = Vec::with_capacity(self.vectors.len() * self.dims * 4);
        for v in &self.vectors {
            blob.extend_from_slice(&vec_to_blob(v));
        }

        std::fs::write(dir.join(VECTORS_FILE), blob)?;
        std::fs::write(dir.join(CHUNKS_FILE), serde_json::to_vec(&self.chunks)?)?;
        // Manifest last, so a half-written index never looks complete.
        std::fs::write(
            dir.join(MANIFEST_FILE),
            serde_json::to_vec_pretty(&self.manifest())?,
        )?;
        Ok(())
    }
}

/// Read only the manifest of an index directory.
pub fn read_manifest(dir: &Path) -> Result<IndexManifest> {
    let path = dir.join(MANIFEST_FILE);
    let bytes =
        std::fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("Failed to parse {}", path.display()))
}
