use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use trailer_rag::config::{DataArgs, EmbedArgs, StoreArgs};
use trailer_rag::logging;
use trailer_rag::pipeline::{Pipeline, StageStatus};

#[derive(Parser, Debug)]
#[command(
    name = "trailer-pipeline",
    about = "Daily update: run scrapers, merge, chunk and re-index in one pass"
)]
struct PipelineCli {
    #[command(flatten)]
    data: DataArgs,

    #[command(flatten)]
    store: StoreArgs,

    #[command(flatten)]
    embed: EmbedArgs,

    /// Scraper command run before merging, as `label=command` (repeatable)
    #[arg(long = "scraper-cmd")]
    scraper_cmds: Vec<String>,

    /// Print the report as JSON instead of text
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    logging::init();
    let cli = PipelineCli::parse();
    let embedder = cli.embed.build()?;
    let store = cli.store.connect().await?;
    let pipeline = Pipeline::new(
        cli.data.pipeline_config(&cli.scraper_cmds),
        &store,
        embedder.as_ref(),
    );
    let report = pipeline.run().await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for stage in &report.stages {
            match &stage.status {
                StageStatus::Succeeded { detail } => {
                    println!("[ok]      {} ({} ms): {}", stage.stage, stage.elapsed_ms, detail)
                }
                StageStatus::Failed { error } if stage.required => {
                    println!("[failed]  {} ({} ms): {}", stage.stage, stage.elapsed_ms, error)
                }
                StageStatus::Failed { error } => {
                    println!("[warning] {} ({} ms): {}", stage.stage, stage.elapsed_ms, error)
                }
                StageStatus::Skipped => println!("[skipped] {}", stage.stage),
            }
        }
    }

    if report.succeeded() {
        println!("Pipeline completed successfully.");
        Ok(ExitCode::SUCCESS)
    } else {
        println!("Pipeline aborted.");
        Ok(ExitCode::FAILURE)
    }
}
