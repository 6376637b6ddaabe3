use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use trailer_rag::config::{EmbedArgs, StoreArgs};
use trailer_rag::logging;
use trailer_rag::query::{render_results, QueryService, DEFAULT_TOP_K};

#[derive(Parser, Debug)]
#[command(
    name = "trailer-search",
    about = "Interactive similarity search over the indexed trailer parts"
)]
struct SearchCli {
    #[command(flatten)]
    store: StoreArgs,

    #[command(flatten)]
    embed: EmbedArgs,

    /// Results shown per query
    #[arg(long, default_value_t = DEFAULT_TOP_K)]
    top_k: usize,

    /// Run a single query and exit instead of prompting
    #[arg(long)]
    query: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let cli = SearchCli::parse();
    let service = QueryService::new(
        Arc::new(cli.store.connect().await?),
        cli.embed.build()?,
    );

    if let Some(query) = cli.query.as_deref() {
        let results = service.query(query, cli.top_k).await?;
        println!("{}", render_results(&results));
        return Ok(());
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("Search trailer parts (or 'exit'): ");
        io::stdout().flush().context("failed to flush stdout")?;
        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("failed to read stdin")?;
        let query = line.trim();
        if query.eq_ignore_ascii_case("exit") || query.eq_ignore_ascii_case("quit") {
            break;
        }
        if query.is_empty() {
            continue;
        }
        match service.query(query, cli.top_k).await {
            Ok(results) => println!("{}", render_results(&results)),
            Err(err) => eprintln!("search failed: {err:#}"),
        }
    }
    Ok(())
}
