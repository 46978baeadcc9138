//! Question → top-k passages.
//!
//! [`Retriever`] is the seam the query handler depends on; the production
//! implementation, [`VectorRetriever`], embeds the question with the same
//! provider that built the index and runs a cosine search over it.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

use crate::embedding::{embed_query, EmbeddingProvider};
use crate::index::VectorIndex;
use crate::models::DocumentChunk;

#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return up to `k` chunks relevant to `question`, most relevant first.
    async fn retrieve(&self, question: &str, k: usize) -> Result<Vec<DocumentChunk>>;
}

pub struct VectorRetriever {
    provider: Arc<dyn EmbeddingProvider>,
    index: Arc<VectorIndex>,
}

impl VectorRetriever {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, index: Arc<VectorIndex>) -> Self {
        if provider.model_name() != index.model() {
            tracing::warn!(
                provider = provider.model_name(),
                index = index.model(),
                "embedding model differs from the one the index was built with"
            );
        }
        Self { provider, index }
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }
}

#[async_trait]
impl Retriever for VectorRetriever {
    async fn retrieve(&self, question: &str, k: usize) -> Result<Vec<DocumentChunk>> {
        let query_vec = embed_query(self.provider.as_ref(), question)
            .await
            .context("Failed to embed question")?;

        let hits = self.index.search(&query_vec, k)?;
        tracing::debug!(
            hits = hits.len(),
            top_score = ?hits.first().map(|h| h.score),
            "retrieved passages"
        );

        Ok(hits.into_iter().map(|h| h.chunk).collect())
    }
}
