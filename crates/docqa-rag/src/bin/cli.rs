//! docqa: index PDFs and ask questions from the terminal
//!
//! Keys come from `GEMINI_API_KEY` and `LLAMA_CLOUD_API_KEY`.

use anyhow::Context;
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docqa_rag::providers::{CloudProviderFactory, ProviderFactory};
use docqa_rag::{
    ChatInterface, CollectionStore, Credentials, DocumentProcessor, QueryEngine, QueryResponse,
    RagConfig,
};

#[derive(Parser)]
#[command(name = "docqa", about = "Question answering over PDF documents", version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true, env = "DOCQA_CONFIG")]
    config: Option<PathBuf>,

    /// Print retrieved sources under each answer
    #[arg(long, global = true)]
    sources: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse, chunk and index a document
    Ingest {
        /// PDF to index
        file: PathBuf,
        /// Collection name (defaults to the configured naming policy)
        #[arg(long)]
        collection: Option<String>,
    },

    /// Ask one question against a collection
    Ask {
        collection: String,
        question: String,
    },

    /// Interactive chat against a collection (`/clear` resets, `/quit` exits)
    Chat { collection: String },

    /// List indexed collections
    Collections,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docqa_rag=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Arc::new(RagConfig::load(cli.config.as_deref())?);
    let store = CollectionStore::open(config.vector_db.database_path())
        .context("failed to open the collection store")?;

    match cli.command {
        Command::Ingest { file, collection } => {
            ingest(config, store, &file, collection.as_deref()).await
        }
        Command::Ask {
            collection,
            question,
        } => {
            let engine = open_engine(config, store, &collection)?;
            let spinner = spinner("Thinking...");
            let response = engine.query(&question).await;
            spinner.finish_and_clear();
            print_answer(&response?, cli.sources);
            Ok(())
        }
        Command::Chat { collection } => {
            let engine = open_engine(config.clone(), store, &collection)?;
            chat(engine, ChatInterface::new(config.chat.history_turns), cli.sources).await
        }
        Command::Collections => list_collections(&store),
    }
}

fn credentials_from_env() -> Credentials {
    Credentials::new(
        std::env::var("GEMINI_API_KEY").unwrap_or_default(),
        std::env::var("LLAMA_CLOUD_API_KEY").unwrap_or_default(),
    )
}

fn processor(config: Arc<RagConfig>, store: CollectionStore) -> anyhow::Result<DocumentProcessor> {
    let providers = CloudProviderFactory::new(config.clone())
        .build(&credentials_from_env())
        .context("set GEMINI_API_KEY and LLAMA_CLOUD_API_KEY")?;
    Ok(DocumentProcessor::new(config, store, providers))
}

fn open_engine(
    config: Arc<RagConfig>,
    store: CollectionStore,
    collection: &str,
) -> anyhow::Result<QueryEngine> {
    Ok(processor(config, store)?.open_engine(collection)?)
}

fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

async fn ingest(
    config: Arc<RagConfig>,
    store: CollectionStore,
    file: &Path,
    collection: Option<&str>,
) -> anyhow::Result<()> {
    let processor = processor(config, store)?;

    let spinner = spinner(&format!("Processing {}...", file.display()));
    let result = processor.process_file(file, collection).await;
    spinner.finish_and_clear();

    let summary = result?.summary;
    if summary.already_indexed {
        println!(
            "{} {} is already indexed in {}",
            style("=").yellow(),
            summary.filename,
            style(&summary.collection).bold()
        );
    } else {
        println!(
            "{} Indexed {} chunks from {} into {} ({} ms)",
            style("✓").green(),
            summary.chunks_indexed,
            summary.filename,
            style(&summary.collection).bold(),
            summary.processing_time_ms
        );
    }
    Ok(())
}

async fn chat(engine: QueryEngine, mut chat: ChatInterface, show_sources: bool) -> anyhow::Result<()> {
    println!(
        "Chatting with {}. {} resets the conversation, {} exits.",
        style(engine.collection()).bold(),
        style("/clear").cyan(),
        style("/quit").cyan()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match line.trim() {
            "/quit" | "/exit" => break,
            "/clear" => {
                chat.clear_chat_history();
                println!("{}", style("Conversation cleared").dim());
                continue;
            }
            _ => {}
        }

        let spinner = spinner("Thinking...");
        let result = chat.process_user_input(&engine, &line).await;
        spinner.finish_and_clear();

        match result {
            Ok(Some(response)) => print_answer(&response, show_sources),
            Ok(None) => {}
            Err(e) => eprintln!("{} {}", style("error:").red().bold(), e),
        }
    }

    Ok(())
}

fn print_answer(response: &QueryResponse, show_sources: bool) {
    println!("{}\n", response.answer);
    if !show_sources {
        return;
    }

    for (i, source) in response.sources.iter().enumerate() {
        let page = source
            .page_number
            .map(|p| format!(" p.{}", p))
            .unwrap_or_default();
        println!(
            "  {} {}{} (score {:.3})",
            style(format!("[{}]", i + 1)).dim(),
            source.filename,
            page,
            source.score
        );
    }
    println!();
}

fn list_collections(store: &CollectionStore) -> anyhow::Result<()> {
    let collections = store.list_collections()?;
    if collections.is_empty() {
        println!("No collections yet. Index one with `docqa ingest <file>`.");
        return Ok(());
    }

    for info in collections {
        println!(
            "{:<40} {:>6} chunks  {} ({} dims)  {}",
            style(&info.name).bold(),
            info.chunk_count,
            info.embedding_model,
            info.dimensions,
            info.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}
