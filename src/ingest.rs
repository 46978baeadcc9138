//! Building the vector index from a directory of text files.
//!
//! Scans `[ingest].root` with include/exclude globs, splits each file into
//! paragraph-bounded chunks, embeds them in batches and writes the result to
//! `[index].path`.

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::chunk::chunk_text;
use crate::config::{Config, IngestConfig};
use crate::embedding::{create_provider, EmbeddingProvider};
use crate::index::{read_manifest, VectorIndex};

/// A text file found under the ingest root.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path relative to the ingest root, with `/` separators.
    pub source: String,
    pub body: String,
}

pub fn scan_documents(config: &IngestConfig, root: &Path) -> Result<Vec<SourceFile>> {
    if !root.exists() {
        bail!("Ingest root does not exist: {}", root.display());
    }

    let include_set = build_globset(&config.include_globs)?;

    let mut default_excludes = vec!["**/.git/**".to_string(), "**/target/**".to_string()];
    default_excludes.extend(config.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut files = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }

        match std::fs::read_to_string(path) {
            Ok(body) => files.push(SourceFile {
                source: rel_str,
                body,
            }),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable file");
            }
        }
    }

    files.sort_by(|a, b| a.source.cmp(&b.source));
    Ok(files)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// Chunk and embed `files` into a new in-memory index.
pub async fn build_index(
    files: &[SourceFile],
    provider: &dyn EmbeddingProvider,
    max_tokens: usize,
    batch_size: usize,
) -> Result<VectorIndex> {
    let chunks: Vec<_> = files
        .iter()
        .flat_map(|f| chunk_text(&f.source, &f.body, max_tokens))
        .collect();

    if chunks.is_empty() {
        bail!("No text found to index");
    }

    let mut index = VectorIndex::new(provider.model_name(), provider.dims());

    for batch in chunks.chunks(batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let vectors = provider.embed_texts(&texts).await?;
        if vectors.len() != batch.len() {
            bail!(
                "embedding provider returned {} vectors for {} texts",
                vectors.len(),
                batch.len()
            );
        }
        for (chunk, vector) in batch.iter().cloned().zip(vectors) {
            index.push(chunk, vector)?;
        }
        tracing::debug!(embedded = index.len(), total = chunks.len(), "embedding batch done");
    }

    Ok(index)
}

/// `vedabot index build`
pub async fn run_index_build(config: &Config, root: Option<PathBuf>) -> Result<()> {
    if !config.embedding.is_enabled() {
        bail!("Building an index requires embeddings. Set [embedding] provider in config.");
    }

    let root = root.unwrap_or_else(|| config.ingest.root.clone());
    let files = scan_documents(&config.ingest, &root)?;
    println!("Scanned {} files under {}", files.len(), root.display());

    let provider = create_provider(&config.embedding)?;
    let index = build_index(
        &files,
        provider.as_ref(),
        config.ingest.max_tokens,
        config.embedding.batch_size,
    )
    .await?;

    index
        .save(&config.index.path)
        .with_context(|| format!("Failed to write index to {}", config.index.path.display()))?;

    println!(
        "Indexed {} chunks ({} dims, model {}) into {}",
        index.len(),
        index.dims(),
        index.model(),
        config.index.path.display()
    );
    Ok(())
}

/// `vedabot index info`
pub fn run_index_info(config: &Config) -> Result<()> {
    let manifest = read_manifest(&config.index.path)?;
    println!("path:       {}", config.index.path.display());
    println!("model:      {}", manifest.model);
    println!("dims:       {}", manifest.dims);
    println!("chunks:     {}", manifest.count);
    if !manifest.created_at.is_empty() {
        println!("created_at: {}", manifest.created_at);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct LengthEmbedder;

    #[async_trait]
    impl EmbeddingProvider for LengthEmbedder {
        fn model_name(&self) -> &str {
            "length"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }
    }

    fn corpus() -> TempDir {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("remedies")).unwrap();
        std::fs::write(
            tmp.path().join("remedies/cold.md"),
            "# Cold\n\nGinger tea with honey.\n\nSteam inhalation with eucalyptus.",
        )
        .unwrap();
        std::fs::write(tmp.path().join("sleep.txt"), "Warm milk with nutmeg.").unwrap();
        std::fs::write(tmp.path().join("image.png"), [0u8, 1, 2]).unwrap();
        tmp
    }

    #[test]
    fn test_scan_filters_and_sorts() {
        let tmp = corpus();
        let files = scan_documents(&IngestConfig::default(), tmp.path()).unwrap();
        let names: Vec<_> = files.iter().map(|f| f.source.as_str()).collect();
        assert_eq!(names, vec!["remedies/cold.md", "sleep.txt"]);
    }

    #[test]
    fn test_scan_exclude_globs() {
        let tmp = corpus();
        let config = IngestConfig {
            exclude_globs: vec!["remedies/**".to_string()],
            ..IngestConfig::default()
        };
        let files = scan_documents(&config, tmp.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].source, "sleep.txt");
    }

    #[test]
    fn test_scan_missing_root() {
        let tmp = TempDir::new().unwrap();
        assert!(scan_documents(&IngestConfig::default(), &tmp.path().join("nope")).is_err());
    }

    #[tokio::test]
    async fn test_build_index_batches_all_chunks() {
        let tmp = corpus();
        let files = scan_documents(&IngestConfig::default(), tmp.path()).unwrap();
        let index = build_index(&files, &LengthEmbedder, 8, 1).await.unwrap();
        assert!(index.len() >= 3);
        assert_eq!(index.model(), "length");
        assert_eq!(index.dims(), 2);
        assert!(index.chunks().iter().any(|c| c.source == "sleep.txt"));
    }

    #[tokio::test]
    async fn test_build_index_empty_corpus() {
        let files = vec![SourceFile {
            source: "blank.md".to_string(),
            body: "\n\n".to_string(),
        }];
        assert!(build_index(&files, &LengthEmbedder, 100, 8).await.is_err());
    }
}
