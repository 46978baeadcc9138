//! The query handler: question → retrieve → prompt → generate.
//!
//! A [`QueryHandler`] is built once (see [`QueryHandler::from_config`]) and
//! shared across requests. [`QueryHandler::run`] reports failures;
//! [`QueryHandler::handle`] never fails and folds every failure into
//! [`QUERY_FALLBACK`] with no source documents.

use anyhow::{bail, Context, Result};
use std::sync::Arc;

use crate::config::Config;
use crate::embedding::{create_provider, EmbeddingProvider};
use crate::index::VectorIndex;
use crate::llm::{HuggingFaceChatModel, LanguageModel};
use crate::models::QueryResponse;
use crate::prompt::PromptTemplate;
use crate::retriever::{Retriever, VectorRetriever};

pub const QUERY_FALLBACK: &str =
    "⚠️ Oops! There was an issue processing your question. Please try again.";

pub struct QueryHandler {
    retriever: Arc<dyn Retriever>,
    model: Arc<dyn LanguageModel>,
    prompt: PromptTemplate,
    top_k: usize,
}

impl QueryHandler {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        model: Arc<dyn LanguageModel>,
        prompt: PromptTemplate,
        top_k: usize,
    ) -> Self {
        Self {
            retriever,
            model,
            prompt,
            top_k,
        }
    }

    /// Assemble the production pipeline.
    ///
    /// The model client is created first so a missing access token is
    /// reported before any index or embedding model is loaded.
    pub fn from_config(config: &Config) -> Result<Self> {
        let model = HuggingFaceChatModel::new(&config.llm)?;

        let provider: Arc<dyn EmbeddingProvider> = Arc::from(create_provider(&config.embedding)?);
        let index = VectorIndex::load(&config.index.path).with_context(|| {
            format!(
                "Failed to load vector index from {} (run `vedabot index build` first)",
                config.index.path.display()
            )
        })?;
        tracing::info!(
            chunks = index.len(),
            model = index.model(),
            "vector index loaded"
        );

        let retriever = VectorRetriever::new(provider, Arc::new(index));

        Ok(Self::new(
            Arc::new(retriever),
            Arc::new(model),
            config.llm.prompt()?,
            config.retrieval.top_k,
        ))
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Run the pipeline, reporting any failure.
    pub async fn run(&self, question: &str) -> Result<QueryResponse> {
        if question.trim().is_empty() {
            bail!("question must not be empty");
        }

        let chunks = self
            .retriever
            .retrieve(question, self.top_k)
            .await
            .context("Retrieval failed")?;

        let prompt = self.prompt.render_chunks(&chunks, question);
        let answer = self
            .model
            .complete(&prompt)
            .await
            .context("Generation failed")?;

        if answer.trim().is_empty() {
            bail!("model {} returned an empty answer", self.model.model_name());
        }

        Ok(QueryResponse::new(answer, chunks))
    }

    /// Run the pipeline, replacing any failure with [`QUERY_FALLBACK`].
    pub async fn handle(&self, question: &str) -> QueryResponse {
        match self.run(question).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %format!("{:#}", e), "error processing query");
                QueryResponse::new(QUERY_FALLBACK, Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;
    use crate::models::DocumentChunk;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FixedRetriever(Vec<DocumentChunk>);

    #[async_trait]
    impl Retriever for FixedRetriever {
        async fn retrieve(&self, _question: &str, k: usize) -> Result<Vec<DocumentChunk>> {
            Ok(self.0.iter().take(k).cloned().collect())
        }
    }

    /// Echoes a canned answer and records the prompt it was given.
    struct RecordingModel {
        answer: String,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LanguageModel for RecordingModel {
        fn model_name(&self) -> &str {
            "recording"
        }
        async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
            self.seen.lock().unwrap().push(prompt.to_string());
            Ok(self.answer.clone())
        }
    }

    fn chunks() -> Vec<DocumentChunk> {
        vec![
            DocumentChunk::new("a#0", "a.md", "Sandalwood paste on the forehead."),
            DocumentChunk::new("b#0", "b.md", "Peppermint oil massage."),
            DocumentChunk::new("c#0", "c.md", "Unrelated passage."),
        ]
    }

    #[tokio::test]
    async fn test_prompt_contains_top_k_context() {
        let model = Arc::new(RecordingModel {
            answer: "Rest.".to_string(),
            seen: Mutex::new(Vec::new()),
        });
        let handler = QueryHandler::new(
            Arc::new(FixedRetriever(chunks())),
            model.clone(),
            PromptTemplate::default(),
            2,
        );

        let resp = handler.run("headache remedy").await.unwrap();
        assert_eq!(resp.source_documents.len(), 2);

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("Sandalwood paste on the forehead.\n\nPeppermint oil massage."));
        assert!(!seen[0].contains("Unrelated passage."));
        assert!(seen[0].contains("Question: headache remedy"));
    }

    #[tokio::test]
    async fn test_blank_question_falls_back() {
        let handler = QueryHandler::new(
            Arc::new(FixedRetriever(chunks())),
            Arc::new(RecordingModel {
                answer: "x".to_string(),
                seen: Mutex::new(Vec::new()),
            }),
            PromptTemplate::default(),
            2,
        );
        assert!(handler.run("   ").await.is_err());
        let resp = handler.handle("   ").await;
        assert_eq!(resp.result, QUERY_FALLBACK);
        assert!(resp.source_documents.is_empty());
    }

    #[tokio::test]
    async fn test_empty_answer_falls_back() {
        let handler = QueryHandler::new(
            Arc::new(FixedRetriever(chunks())),
            Arc::new(RecordingModel {
                answer: "  ".to_string(),
                seen: Mutex::new(Vec::new()),
            }),
            PromptTemplate::default(),
            2,
        );
        assert_eq!(handler.handle("cold").await.result, QUERY_FALLBACK);
    }

    #[test]
    fn test_from_config_requires_token_before_index() {
        let mut config = Config::minimal();
        config.llm.token_env = "VEDABOT_TEST_QUERY_TOKEN_NEVER_SET".to_string();
        config.index.path = "/nonexistent/vedabot/index".into();
        let err = match QueryHandler::from_config(&config) {
            Ok(_) => panic!("expected missing token error"),
            Err(e) => e,
        };
        assert!(err.to_string().contains("VEDABOT_TEST_QUERY_TOKEN_NEVER_SET"));
    }
}
