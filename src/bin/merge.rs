use anyhow::Result;
use clap::Parser;
use trailer_rag::config::DataArgs;
use trailer_rag::logging;
use trailer_rag::merge::run_merge;

#[derive(Parser, Debug)]
#[command(
    name = "trailer-merge",
    about = "Normalize the newest scraper output per site into one merged product file"
)]
struct MergeCli {
    #[command(flatten)]
    data: DataArgs,
}

fn main() -> Result<()> {
    logging::init();
    let cli = MergeCli::parse();
    let outcome = run_merge(&cli.data.data_dir, &cli.data.merged_dir)?;
    println!(
        "Merged {} products ({}) -> {}",
        outcome.report.products.len(),
        outcome.report.summary(),
        outcome.path.display()
    );
    Ok(())
}
