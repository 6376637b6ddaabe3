use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use trailer_rag::config::{DataArgs, EmbedArgs, LlmArgs, StoreArgs};
use trailer_rag::logging;
use trailer_rag::query::{QueryService, DEFAULT_TOP_K};
use trailer_rag::server::{app, AppState};

#[derive(Parser, Debug)]
#[command(
    name = "trailer-server",
    about = "HTTP front end for trailer parts search, chat and pipeline runs"
)]
struct ServerCli {
    /// Address to bind the HTTP server to (host:port).
    #[arg(long, env = "TRAILER_BIND", default_value = "127.0.0.1:8080")]
    bind: String,

    #[command(flatten)]
    data: DataArgs,

    #[command(flatten)]
    store: StoreArgs,

    #[command(flatten)]
    embed: EmbedArgs,

    #[command(flatten)]
    llm: LlmArgs,

    /// Scraper command run by `/pipeline` before merging, as `label=command` (repeatable)
    #[arg(long = "scraper-cmd")]
    scraper_cmds: Vec<String>,

    /// Default top-k when the client does not override it.
    #[arg(long, default_value_t = DEFAULT_TOP_K)]
    default_top_k: usize,

    /// Maximum top-k allowed per request.
    #[arg(long, default_value_t = 20)]
    max_top_k: usize,

    /// Query embeddings kept in memory (0 disables the cache).
    #[arg(long, env = "TRAILER_EMBED_CACHE", default_value_t = 256)]
    embedding_cache_size: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let cli = ServerCli::parse();
    let query = QueryService::new(
        Arc::new(cli.store.connect().await?),
        cli.embed.build()?,
    );
    let state = AppState::new(
        query,
        cli.llm.build()?,
        cli.data.pipeline_config(&cli.scraper_cmds),
        cli.embedding_cache_size,
        cli.default_top_k,
        cli.max_top_k,
    );

    let addr: SocketAddr = cli
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", cli.bind))?;
    println!("trailer-server listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app(state))
        .await
        .context("server shutdown")?;
    Ok(())
}
