use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use trailer_rag::answer::answer;
use trailer_rag::config::{EmbedArgs, LlmArgs, StoreArgs};
use trailer_rag::logging;
use trailer_rag::query::{QueryService, DEFAULT_TOP_K};

#[derive(Parser, Debug)]
#[command(
    name = "trailer-chat",
    about = "Answer trailer parts questions grounded in the indexed catalog"
)]
struct ChatCli {
    #[command(flatten)]
    store: StoreArgs,

    #[command(flatten)]
    embed: EmbedArgs,

    #[command(flatten)]
    llm: LlmArgs,

    /// Listings retrieved as context per question
    #[arg(long, default_value_t = DEFAULT_TOP_K)]
    top_k: usize,

    /// Ask a single question and exit instead of prompting
    #[arg(long)]
    question: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let cli = ChatCli::parse();
    let service = QueryService::new(
        Arc::new(cli.store.connect().await?),
        cli.embed.build()?,
    );
    let completion = cli.llm.build()?;

    if let Some(question) = cli.question.as_deref() {
        let results = service.query(question, cli.top_k).await?;
        println!("{}", answer(question, &results, completion.as_ref()).await);
        return Ok(());
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("Ask about trailer parts (or 'exit'): ");
        io::stdout().flush().context("failed to flush stdout")?;
        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("failed to read stdin")?;
        let question = line.trim();
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            break;
        }
        if question.is_empty() {
            continue;
        }
        match service.query(question, cli.top_k).await {
            Ok(results) => {
                println!("\n{}\n", answer(question, &results, completion.as_ref()).await)
            }
            Err(err) => eprintln!("search failed: {err:#}"),
        }
    }
    Ok(())
}
