use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use devsite::chat::ChatSession;
use devsite::config::Config;
use devsite::embedder::Embedder;
use devsite::embedder::ollama::OllamaEmbedder;
use devsite::indexer::{self, DEFAULT_EXCLUDE_DIRS};
use devsite::llm::LanguageModel;
use devsite::llm::ollama::OllamaClient;
use devsite::retrieval::{FallbackController, StoreSearcher};
use devsite::router::Router;
use devsite::store::Store;

#[derive(Parser)]
#[command(name = "devsite", version, about = "Local RAG assistant over documentation and code")]
struct Cli {
    /// Path to the JSON config file (defaults to ./config.json)
    #[arg(long, default_value = "")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the documentation index from Markdown/MDX roots
    IndexDocs {
        /// One or more source roots
        #[arg(long, num_args = 1..)]
        path: Vec<PathBuf>,

        /// Collection name overriding the configured database file
        #[arg(long)]
        collection: Option<String>,
    },

    /// Build the code index from source roots
    IndexCode {
        /// One or more source roots
        #[arg(long, num_args = 1..)]
        path: Vec<PathBuf>,

        /// Directory names to skip
        #[arg(long = "exclude-dirs", num_args = 1..)]
        exclude_dirs: Vec<String>,

        /// Collection name overriding the configured database file
        #[arg(long)]
        collection: Option<String>,
    },

    /// Ask questions interactively over the built indexes
    Chat {
        /// Chat model identifier (the DEVSITE_MODEL env var takes precedence)
        #[arg(long)]
        model: Option<String>,
    },
}

fn collection_path(configured: &str, collection: Option<&str>) -> String {
    match collection {
        Some(name) => format!("./{name}.db"),
        None => configured.to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let embedder = OllamaEmbedder::new(
        &config.model.ollama_url,
        &config.model.embedding_model,
        config.model.dimensions,
    );

    match cli.command {
        Command::IndexDocs { path, collection } => {
            let paths = if path.is_empty() {
                vec![PathBuf::from("./data")]
            } else {
                path
            };
            let db_path = collection_path(&config.docs_db_path, collection.as_deref());
            let mut store = Store::create(&db_path, config.model.dimensions)?;

            let report = indexer::build_docs_index(&paths, &mut store, &embedder).await?;
            println!(
                "Indexed {} documentation files into {} ({} chunks, {} failed)",
                report.files, db_path, report.chunks, report.failed
            );
        }

        Command::IndexCode {
            path,
            exclude_dirs,
            collection,
        } => {
            let paths = if path.is_empty() {
                vec![PathBuf::from("./")]
            } else {
                path
            };
            let exclude = if exclude_dirs.is_empty() {
                DEFAULT_EXCLUDE_DIRS.iter().map(|d| d.to_string()).collect()
            } else {
                exclude_dirs
            };
            let db_path = collection_path(&config.code_db_path, collection.as_deref());
            let mut store = Store::create(&db_path, config.model.dimensions)?;

            let report =
                indexer::build_code_index(&paths, &exclude, &mut store, &embedder).await?;
            println!(
                "Indexed {} code files into {} ({} chunks, {} failed)",
                report.files, db_path, report.chunks, report.failed
            );
        }

        Command::Chat { model } => {
            let docs_store = match Store::open(&config.docs_db_path) {
                Ok(store) => Some(store),
                Err(e) => {
                    warn!("Documentation index unavailable: {e:#}");
                    None
                }
            };
            let code_store = match Store::open(&config.code_db_path) {
                Ok(store) => Some(store),
                Err(e) => {
                    warn!("Code index unavailable: {e:#}");
                    None
                }
            };

            anyhow::ensure!(
                docs_store.is_some() || code_store.is_some(),
                "No indexes found. Run `devsite index-docs` and `devsite index-code` first."
            );

            let docs_available = docs_store.is_some();
            let code_available = code_store.is_some();

            let chat_model = config.resolve_chat_model(model.as_deref());
            let llm: Arc<dyn LanguageModel> =
                Arc::new(OllamaClient::new(&config.model.ollama_url, &chat_model));
            let embedder: Arc<dyn Embedder> = Arc::new(embedder);

            let searcher = Arc::new(StoreSearcher::new(
                docs_store,
                code_store,
                embedder,
                config.docs_top_k,
                config.code_top_k,
            ));
            let router = Router::new(llm.clone(), config.router_policy);
            let controller = FallbackController::new(router, searcher);

            let mut session = ChatSession::new(controller, llm, docs_available, code_available);
            session.run_repl().await?;
        }
    }

    Ok(())
}
