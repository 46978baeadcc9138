//! # Vedabot
//!
//! A retrieval-augmented question-answering companion for Ayurvedic home
//! remedies.
//!
//! A question is embedded, the closest passages are pulled from a
//! precomputed vector index, and both are handed to a hosted chat-completion
//! model through a fixed prompt template. Answers are kept in a per-user
//! chat log and served through a CLI and a small web UI.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌─────────────┐   ┌──────────────┐
//! │ Question │──▶│ Embedding │──▶│ VectorIndex │──▶│ PromptTemplate│
//! └──────────┘   └───────────┘   │   top-k     │   └──────┬───────┘
//!                                └─────────────┘          ▼
//!                      ┌──────────────┐           ┌──────────────┐
//!                      │ QueryResponse│◀──────────│ LanguageModel│
//!                      └──────┬───────┘           └──────────────┘
//!                             ▼
//!                ┌──────────────┐   ┌──────────────┐
//!                │ HistoryStore │   │  CLI / HTTP  │
//!                └──────────────┘   └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! vedabot index build --root ./corpus     # embed a directory of .md/.txt files
//! vedabot ask "What are Ayurvedic remedies for a cold?"
//! vedabot history list
//! vedabot serve                           # web UI on [server].bind
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Chunks, responses and chat entries |
//! | [`chunk`] | Paragraph-boundary text chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`index`] | Persisted vector index and cosine search |
//! | [`retriever`] | Question → top-k chunks |
//! | [`prompt`] | Prompt template with `{context}` and `{question}` slots |
//! | [`llm`] | Hosted chat-completion client |
//! | [`query`] | The query handler tying the pipeline together |
//! | [`history`] | Per-user JSON chat logs |
//! | [`format`] | Answer presentation |
//! | [`ingest`] | Building the vector index from files |
//! | [`server`] | Web UI and JSON API |
//! | [`logging`] | Tracing subscriber setup |

pub mod chunk;
pub mod config;
pub mod embedding;
pub mod format;
pub mod history;
pub mod index;
pub mod ingest;
pub mod llm;
pub mod logging;
pub mod models;
pub mod prompt;
pub mod query;
pub mod retriever;
pub mod server;
