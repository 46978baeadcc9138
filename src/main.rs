//! # Vedabot CLI (`vedabot`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `vedabot ask "<question>"` | Answer a question and save it to the chat log |
//! | `vedabot history list` | Show a user's chat log |
//! | `vedabot history clear` | Delete a user's chat log |
//! | `vedabot index build` | Embed the ingest corpus into the vector index |
//! | `vedabot index info` | Show the index manifest |
//! | `vedabot serve` | Start the web UI and JSON API |
//!
//! ## Examples
//!
//! ```bash
//! export HUGGINGFACEHUB_ACCESS_TOKEN=hf_...
//! vedabot index build --root ./corpus
//! vedabot ask "What are common Ayurveda remedies for headache?"
//! vedabot history list --user meera
//! vedabot serve --config ./config/vedabot.toml
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use vedabot::config;
use vedabot::format::{format_response, format_sources};
use vedabot::history::{validate_user, HistoryStore, DEFAULT_USER};
use vedabot::ingest;
use vedabot::logging;
use vedabot::models::ChatEntry;
use vedabot::query::QueryHandler;
use vedabot::server;

/// Vedabot: your Ayurvedic home remedies buddy.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. Built-in defaults are used when the file does not exist.
#[derive(Parser)]
#[command(
    name = "vedabot",
    about = "Vedabot: retrieval-augmented answers to Ayurvedic health questions",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/vedabot.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a health question from the indexed knowledge base.
    ///
    /// Pipeline failures print the fallback message instead of failing,
    /// unless `--strict` is given.
    Ask {
        /// The question to answer.
        question: String,

        /// Chat log to record the exchange in.
        #[arg(long, default_value = DEFAULT_USER)]
        user: String,

        /// Print the raw response as JSON.
        #[arg(long)]
        json: bool,

        /// Exit with an error instead of printing the fallback message.
        #[arg(long)]
        strict: bool,

        /// Do not record the exchange in the chat log.
        #[arg(long)]
        no_save: bool,
    },

    /// Inspect or clear chat logs.
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Build or inspect the vector index.
    Index {
        #[command(subcommand)]
        action: IndexAction,
    },

    /// Start the web UI and JSON API on `[server].bind`.
    Serve,
}

#[derive(Subcommand)]
enum HistoryAction {
    /// Print `time - question` for each entry.
    List {
        #[arg(long, default_value = DEFAULT_USER)]
        user: String,
    },
    /// Delete the chat log.
    Clear {
        #[arg(long, default_value = DEFAULT_USER)]
        user: String,
    },
}

#[derive(Subcommand)]
enum IndexAction {
    /// Chunk and embed every matching file under the ingest root.
    Build {
        /// Override `[ingest].root`.
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Print the index manifest.
    Info,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init();

    let cli = Cli::parse();
    let cfg = config::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Ask {
            question,
            user,
            json,
            strict,
            no_save,
        } => {
            validate_user(&user)?;
            let handler = QueryHandler::from_config(&cfg)?;
            let response = if strict {
                handler.run(&question).await?
            } else {
                handler.handle(&question).await
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                println!("{}", format_response(&response.result));
                if !response.source_documents.is_empty() {
                    println!("Sources:\n{}", format_sources(&response.source_documents));
                }
            }

            if !no_save {
                let history = HistoryStore::new(cfg.history.dir.clone());
                history.append(&user, ChatEntry::new(question, response)).await?;
            }
        }
        Commands::History { action } => {
            let history = HistoryStore::new(cfg.history.dir.clone());
            match action {
                HistoryAction::List { user } => {
                    let entries = history.load(&user).await?;
                    if entries.is_empty() {
                        println!("No chat history.");
                    }
                    for entry in entries {
                        println!("{} - {}", entry.time_display(), entry.question_display());
                    }
                }
                HistoryAction::Clear { user } => {
                    if history.clear(&user).await? {
                        println!("Chat History has been cleared.");
                    } else {
                        println!("No chat history.");
                    }
                }
            }
        }
        Commands::Index { action } => match action {
            IndexAction::Build { root } => {
                ingest::run_index_build(&cfg, root).await?;
            }
            IndexAction::Info => {
                ingest::run_index_info(&cfg)?;
            }
        },
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
