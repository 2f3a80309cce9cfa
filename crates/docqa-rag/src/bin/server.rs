//! Document Q&A server binary
//!
//! Run with: cargo run -p docqa-rag --bin docqa-rag-server [config.toml]
//!
//! The config path may also come from `DOCQA_CONFIG`. API keys are not read
//! here; each session supplies its own.

use docqa_rag::{config::RagConfig, server::DocQaServer};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docqa_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!(
        r#"
╔═══════════════════════════════════════════════════════════╗
║                      DocQA RAG Server                     ║
║              Ask questions about your PDFs                ║
╚═══════════════════════════════════════════════════════════╝
"#
    );

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("DOCQA_CONFIG").ok())
        .map(PathBuf::from);
    let config = RagConfig::load(config_path.as_deref())?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Parser backend: {:?}", config.parser.backend);
    tracing::info!("  - Embedding model: {}", config.embeddings.model);
    tracing::info!("  - Embedding dimensions: {}", config.embeddings.dimensions);
    tracing::info!("  - LLM model: {}", config.llm.model);
    tracing::info!(
        "  - Chunk size: {} (overlap {})",
        config.chunking.chunk_size,
        config.chunking.chunk_overlap
    );
    tracing::info!("  - Storage: {}", config.vector_db.database_path().display());

    let server = DocQaServer::new(config)?;

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nEndpoints:");
    println!("  POST /api/sessions                  - Start a session");
    println!("  PUT  /api/sessions/:id/credentials  - Set API keys");
    println!("  POST /api/sessions/:id/document     - Upload a PDF");
    println!("  POST /api/sessions/:id/query        - Ask a question");
    println!("  POST /api/sessions/:id/chat         - Chat about the document");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
