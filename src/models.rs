//! Core data models used throughout Vedabot.
//!
//! These types represent the indexed passages, the answers produced by the
//! query pipeline, and the chat entries persisted per user.

use chrono::Local;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Timestamp format used for [`ChatEntry::time`].
pub const CHAT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A passage of a source document, as stored in the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub text: String,
    /// Relative path (or other identifier) of the originating document.
    pub source: String,
    #[serde(default = "empty_object")]
    pub metadata: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::json!({})
}

impl DocumentChunk {
    pub fn new(id: impl Into<String>, source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            source: source.into(),
            metadata: empty_object(),
        }
    }
}

/// The answer to one question, with the passages it was grounded on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub result: String,
    #[serde(default)]
    pub source_documents: Vec<DocumentChunk>,
}

impl QueryResponse {
    pub fn new(result: impl Into<String>, source_documents: Vec<DocumentChunk>) -> Self {
        Self {
            result: result.into(),
            source_documents,
        }
    }
}

/// One question/answer exchange in a user's chat log.
///
/// Every field has a serde default so that older logs holding only `time`
/// and `question` still load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatEntry {
    #[serde(default)]
    pub chat_id: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub response: QueryResponse,
}

impl ChatEntry {
    /// Stamp a new entry with a fresh id and the current local time.
    pub fn new(question: impl Into<String>, response: QueryResponse) -> Self {
        Self {
            chat_id: Uuid::new_v4().to_string(),
            time: Local::now().format(CHAT_TIME_FORMAT).to_string(),
            question: question.into(),
            response,
        }
    }

    pub fn time_display(&self) -> &str {
        if self.time.is_empty() {
            "Time Not Available"
        } else {
            &self.time
        }
    }

    pub fn question_display(&self) -> &str {
        if self.question.is_empty() {
            "Question Not Available"
        } else {
            &self.question
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_entry_new_stamps_id_and_time() {
        let entry = ChatEntry::new("cold remedy", QueryResponse::new("ginger tea", vec![]));
        assert_eq!(entry.chat_id.len(), 36);
        assert!(chrono::NaiveDateTime::parse_from_str(&entry.time, CHAT_TIME_FORMAT).is_ok());
        assert_eq!(entry.question, "cold remedy");
    }

    #[test]
    fn test_legacy_entry_without_response_loads() {
        let entry: ChatEntry =
            serde_json::from_str(r#"{"time": "2024-05-01 10:00:00", "question": "acidity"}"#)
                .unwrap();
        assert!(entry.chat_id.is_empty());
        assert!(entry.response.result.is_empty());
        assert_eq!(entry.question_display(), "acidity");
    }

    #[test]
    fn test_display_placeholders() {
        let entry = ChatEntry::default();
        assert_eq!(entry.time_display(), "Time Not Available");
        assert_eq!(entry.question_display(), "Question Not Available");
    }

    #[test]
    fn test_chunk_metadata_defaults_to_object() {
        let chunk: DocumentChunk =
            serde_json::from_str(r#"{"id": "a#0", "text": "tulsi", "source": "a.md"}"#).unwrap();
        assert!(chunk.metadata.is_object());
    }
}
