use anyhow::Result;
use clap::Parser;
use trailer_rag::config::{DataArgs, EmbedArgs, StoreArgs};
use trailer_rag::index::run_indexing;
use trailer_rag::logging;

#[derive(Parser, Debug)]
#[command(
    name = "trailer-index",
    about = "Rebuild the pgvector collection from the chunk file"
)]
struct IndexCli {
    #[command(flatten)]
    data: DataArgs,

    #[command(flatten)]
    store: StoreArgs,

    #[command(flatten)]
    embed: EmbedArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let cli = IndexCli::parse();
    let embedder = cli.embed.build()?;
    let store = cli.store.connect().await?;
    let count = run_indexing(&store, embedder.as_ref(), &cli.data.chunk_file).await?;
    println!(
        "Indexed {} products into {}",
        count,
        store.collection().qualified()
    );
    Ok(())
}
