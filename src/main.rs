//! # askdocs CLI (`ask`)
//!
//! The `ask` binary is the interface to the documentation chatbot. It
//! provides commands for database initialization, document ingestion,
//! index inspection, and the interactive chat itself.
//!
//! ## Usage
//!
//! ```bash
//! ask --config ./config/askdocs.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ask init` | Create the SQLite database and run schema migrations |
//! | `ask sources` | List configured connectors and their health |
//! | `ask sync <connector>` | Ingest documents from a connector |
//! | `ask search "<query>"` | Query the index directly |
//! | `ask chat` | Start the interactive chatbot |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use askdocs::{chat, config, ingest, migrate, search, sources};

/// askdocs — a retrieval-augmented documentation chatbot.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/askdocs.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "ask",
    about = "askdocs — a retrieval-augmented documentation chatbot",
    version,
    long_about = "askdocs ingests documentation from local folders and optional Confluence/Mantis \
    APIs, chunks and indexes it in SQLite, and answers questions in an interactive chat that \
    searches the index when the conversation needs it."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/askdocs.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables
    /// (documents, chunks, chunks_fts, embeddings, chunk_vectors).
    /// Idempotent: running it multiple times is safe.
    Init,

    /// List configured connectors and their status.
    Sources,

    /// Ingest documents from a connector.
    ///
    /// Scans the named connector (or `all`), normalizes items into
    /// documents, chunks them, optionally embeds them, and stores
    /// everything in SQLite.
    Sync {
        /// Connector name: `all`, `filesystem`, `confluence`, or `mantis`.
        connector: String,

        /// Show item and chunk counts without writing to the database.
        #[arg(long)]
        dry_run: bool,

        /// Maximum number of items to process per connector.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Query the index directly and print ranked chunks.
    Search {
        /// The search query string.
        query: String,

        /// Maximum number of results to return.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Start the interactive chatbot.
    ///
    /// Fails if no documents have been ingested yet.
    Chat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Sources => {
            sources::list_sources(&cfg)?;
        }
        Commands::Sync {
            connector,
            dry_run,
            limit,
        } => {
            ingest::run_sync(&cfg, &connector, dry_run, limit).await?;
        }
        Commands::Search { query, limit } => {
            search::run_search(&cfg, &query, limit).await?;
        }
        Commands::Chat => {
            chat::run_chat(&cfg).await?;
        }
    }

    Ok(())
}
