//! Paragraph-boundary text chunker.
//!
//! Splits a document body into [`DocumentChunk`]s that respect a
//! configurable `max_tokens` limit. Splitting occurs on paragraph boundaries
//! (`\n\n`) so that a remedy and its precautions tend to stay together.
//!
//! Chunk ids are `<source>#<index>`, and each chunk carries its index and a
//! SHA-256 hash of its text in `metadata`.

use sha2::{Digest, Sha256};

use crate::models::DocumentChunk;

/// Approximate chars-per-token ratio.
const CHARS_PER_TOKEN: usize = 4;

/// Split text into chunks on paragraph boundaries, respecting max_tokens.
/// Returns chunks with contiguous indices starting at 0; blank text yields none.
pub fn chunk_text(source: &str, text: &str, max_tokens: usize) -> Vec<DocumentChunk> {
    let max_chars = max_tokens.max(1) * CHARS_PER_TOKEN;

    let mut chunks = Vec::new();
    let mut current_buf = String::new();

    for para in text.split("\n\n") {
        let trimmed = para.trim();
        if trimmed.is_empty() {
            continue;
        }

        let would_be = if current_buf.is_empty() {
            trimmed.len()
        } else {
            current_buf.len() + 2 + trimmed.len()
        };

        if would_be > max_chars && !current_buf.is_empty() {
            push_chunk(&mut chunks, source, &current_buf);
            current_buf.clear();
        }

        if trimmed.len() > max_chars {
            let mut remaining = trimmed;
            while !remaining.is_empty() {
                let split_at = floor_char_boundary(remaining, max_chars);
                let actual_split = if split_at < remaining.len() {
                    remaining[..split_at]
                        .rfind('\n')
                        .or_else(|| remaining[..split_at].rfind(' '))
                        .map(|pos| pos + 1)
                        .unwrap_or(split_at)
                } else {
                    split_at
                };
                let piece = remaining[..actual_split].trim();
                if !piece.is_empty() {
                    push_chunk(&mut chunks, source, piece);
                }
                remaining = &remaining[actual_split..];
            }
        } else {
            if !current_buf.is_empty() {
                current_buf.push_str("\n\n");
            }
            current_buf.push_str(trimmed);
        }
    }

    if !current_buf.is_empty() {
        push_chunk(&mut chunks, source, &current_buf);
    }

    chunks
}

/// Largest byte offset `<= max` that lies on a char boundary (and is never 0 for non-empty input).
fn floor_char_boundary(s: &str, max: usize) -> usize {
    if max >= s.len() {
        return s.len();
    }
    let mut idx = max;
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    if idx == 0 {
        s.chars().next().map(char::len_utf8).unwrap_or(s.len())
    } else {
        idx
    }
}

fn push_chunk(chunks: &mut Vec<DocumentChunk>, source: &str, text: &str) {
    let index = chunks.len();
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    let mut chunk = DocumentChunk::new(format!("{}#{}", source, index), source, text);
    chunk.metadata = serde_json::json!({
        "chunk_index": index,
        "hash": hash,
    });
    chunks.push(chunk);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_of(chunk: &DocumentChunk) -> u64 {
        chunk.metadata["chunk_index"].as_u64().unwrap()
    }

    #[test]
    fn test_small_text_single_chunk() {
        let chunks = chunk_text("cold.md", "Drink warm ginger tea.", 125);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, "cold.md#0");
        assert_eq!(chunks[0].source, "cold.md");
        assert_eq!(chunks[0].text, "Drink warm ginger tea.");
    }

    #[test]
    fn test_blank_text_yields_nothing() {
        assert!(chunk_text("empty.md", "", 125).is_empty());
        assert!(chunk_text("empty.md", "\n\n  \n\n", 125).is_empty());
    }

    #[test]
    fn test_multiple_paragraphs_under_limit() {
        let text = "Tulsi for cough.\n\nTurmeric milk at night.\n\nAvoid cold drinks.";
        let chunks = chunk_text("doc.md", text, 125);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.contains("Tulsi"));
        assert!(chunks[0].text.contains("Avoid cold drinks."));
    }

    #[test]
    fn test_paragraphs_exceed_limit_indices_contiguous() {
        let text = (0..40)
            .map(|i| format!("Remedy number {} with honey.", i))
            .collect::<Vec<_>>()
            .join("\n\n");
        let chunks = chunk_text("doc.md", &text, 10);
        assert!(chunks.len() > 1);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(index_of(c), i as u64);
            assert_eq!(c.id, format!("doc.md#{}", i));
        }
    }

    #[test]
    fn test_long_paragraph_hard_split() {
        let text = "ashwagandha ".repeat(100);
        let chunks = chunk_text("long.md", &text, 10);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.text.len() <= 40));
    }

    #[test]
    fn test_multibyte_text_does_not_panic() {
        let text = "हल्दी".repeat(50);
        let chunks = chunk_text("hi.md", &text, 3);
        let rejoined: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(rejoined, text);
    }

    #[test]
    fn test_deterministic() {
        let text = "Alpha\n\nBeta\n\nGamma\n\nDelta";
        let c1 = chunk_text("doc.md", text, 2);
        let c2 = chunk_text("doc.md", text, 2);
        assert_eq!(c1, c2);
    }
}
