use anyhow::Result;
use clap::Parser;
use trailer_rag::chunker::run_chunking;
use trailer_rag::config::DataArgs;
use trailer_rag::logging;

#[derive(Parser, Debug)]
#[command(
    name = "trailer-chunk",
    about = "Turn the newest merged product file into retrievable text chunks"
)]
struct ChunkCli {
    #[command(flatten)]
    data: DataArgs,
}

fn main() -> Result<()> {
    logging::init();
    let cli = ChunkCli::parse();
    let outcome = run_chunking(&cli.data.merged_dir, &cli.data.chunk_file)?;
    println!(
        "Chunked {} products from {} -> {}",
        outcome.count,
        outcome.source.display(),
        outcome.path.display()
    );
    Ok(())
}
