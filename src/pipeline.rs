//! In-process daily update: scrapers, merge, chunk and index.
//!
//! Scraper failures are reported and the run continues with whatever data is on
//! disk; merge, chunk and index halt the run on the first failure.

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Local};
use serde::Serialize;
use tokio::process::Command;
use tracing::{error, info, warn};

use crate::chunker::run_chunking;
use crate::embedder::Embedder;
use crate::index::run_indexing;
use crate::merge::run_merge;
use crate::store::VectorStore;

/// External scraper invocation run before the merge stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScraperCommand {
    /// Label shown in reports.
    pub label: String,
    /// Shell command line.
    pub command: String,
}

impl ScraperCommand {
    /// Parses `label=command`; a bare command is labelled by itself.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once('=') {
            Some((label, command)) if !label.trim().is_empty() && !label.contains(' ') => Self {
                label: label.trim().to_string(),
                command: command.trim().to_string(),
            },
            _ => Self {
                label: raw.trim().to_string(),
                command: raw.trim().to_string(),
            },
        }
    }
}

/// Locations and hooks for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Scraper commands, run in order before merging.
    pub scrapers: Vec<ScraperCommand>,
    /// Directory holding raw scraper output.
    pub data_dir: PathBuf,
    /// Directory the merged file is written to and read back from.
    pub merged_dir: PathBuf,
    /// Chunk file path.
    pub chunk_file: PathBuf,
}

/// Failure of a single stage.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// A scraper command could not be started.
    #[error("failed to launch `{command}`: {source}")]
    Spawn {
        /// Command line.
        command: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A scraper command exited unsuccessfully.
    #[error("`{command}` exited with {status}")]
    Exit {
        /// Command line.
        command: String,
        /// Exit status as reported by the OS.
        status: String,
    },
    /// A merge, chunk or index stage failed.
    #[error(transparent)]
    Stage(#[from] anyhow::Error),
}

/// Outcome of one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageStatus {
    /// Completed, with a short summary.
    Succeeded {
        /// Human summary.
        detail: String,
    },
    /// Failed. Later stages were skipped when the stage is required.
    Failed {
        /// Error chain.
        error: String,
    },
    /// Not run because an earlier stage failed.
    Skipped,
}

/// Report entry for one stage.
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    /// Stage label.
    pub stage: String,
    /// Whether a failure of this stage halts the run.
    pub required: bool,
    /// Outcome.
    #[serde(flatten)]
    pub status: StageStatus,
    /// Wall-clock time spent, zero for skipped stages.
    pub elapsed_ms: u128,
}

/// Structured result of a pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    /// Run start time.
    pub started_at: DateTime<Local>,
    /// Run end time.
    pub finished_at: DateTime<Local>,
    /// Every stage in execution order.
    pub stages: Vec<StageReport>,
}

impl PipelineReport {
    /// Whether every required stage succeeded. Failed scrapers do not count.
    pub fn succeeded(&self) -> bool {
        self.stages
            .iter()
            .filter(|stage| stage.required)
            .all(|stage| matches!(stage.status, StageStatus::Succeeded { .. }))
    }

    /// First failed required stage, if any.
    pub fn failed_stage(&self) -> Option<&StageReport> {
        self.stages
            .iter()
            .find(|stage| stage.required && matches!(stage.status, StageStatus::Failed { .. }))
    }

    /// Optional stages (scrapers) that failed without halting the run.
    pub fn warnings(&self) -> impl Iterator<Item = &StageReport> {
        self.stages
            .iter()
            .filter(|stage| !stage.required && matches!(stage.status, StageStatus::Failed { .. }))
    }
}

enum Stage {
    Scrape(ScraperCommand),
    Merge,
    Chunk,
    Index,
}

impl Stage {
    fn label(&self) -> String {
        match self {
            Self::Scrape(scraper) => format!("Running {} scraper", scraper.label),
            Self::Merge => "Merging & normalizing data".to_string(),
            Self::Chunk => "Chunking merged data".to_string(),
            Self::Index => "Embedding into the vector store".to_string(),
        }
    }

    fn required(&self) -> bool {
        !matches!(self, Self::Scrape(_))
    }
}

/// Runs the configured stages against a store and embedder.
pub struct Pipeline<'a> {
    config: PipelineConfig,
    store: &'a dyn VectorStore,
    embedder: &'a dyn Embedder,
}

impl<'a> Pipeline<'a> {
    /// Builds a pipeline.
    pub fn new(
        config: PipelineConfig,
        store: &'a dyn VectorStore,
        embedder: &'a dyn Embedder,
    ) -> Self {
        Self {
            config,
            store,
            embedder,
        }
    }

    /// Runs every stage in order, stopping at the first failed required stage.
    pub async fn run(&self) -> PipelineReport {
        let started_at = Local::now();
        let mut stages: Vec<Stage> = self
            .config
            .scrapers
            .iter()
            .cloned()
            .map(Stage::Scrape)
            .collect();
        stages.extend([Stage::Merge, Stage::Chunk, Stage::Index]);

        let mut reports = Vec::with_capacity(stages.len());
        let mut halted = false;
        for stage in &stages {
            let label = stage.label();
            let required = stage.required();
            if halted {
                reports.push(StageReport {
                    stage: label,
                    required,
                    status: StageStatus::Skipped,
                    elapsed_ms: 0,
                });
                continue;
            }
            info!(stage = %label, "starting stage");
            let start = Instant::now();
            let status = match self.run_stage(stage).await {
                Ok(detail) => {
                    info!(stage = %label, %detail, "stage completed");
                    StageStatus::Succeeded { detail }
                }
                Err(err) if required => {
                    error!(stage = %label, error = %err, "stage failed; aborting pipeline");
                    halted = true;
                    StageStatus::Failed {
                        error: format_error(&err),
                    }
                }
                Err(err) => {
                    warn!(stage = %label, error = %err, "scraper failed; continuing with existing data");
                    StageStatus::Failed {
                        error: format_error(&err),
                    }
                }
            };
            reports.push(StageReport {
                stage: label,
                required,
                status,
                elapsed_ms: start.elapsed().as_millis(),
            });
        }

        PipelineReport {
            started_at,
            finished_at: Local::now(),
            stages: reports,
        }
    }

    async fn run_stage(&self, stage: &Stage) -> Result<String, StageError> {
        match stage {
            Stage::Scrape(scraper) => self.run_scraper(scraper).await,
            Stage::Merge => {
                let outcome = run_merge(&self.config.data_dir, &self.config.merged_dir)?;
                Ok(format!(
                    "merged {} products ({}) into {}",
                    outcome.report.products.len(),
                    outcome.report.summary(),
                    outcome.path.display()
                ))
            }
            Stage::Chunk => {
                let outcome = run_chunking(&self.config.merged_dir, &self.config.chunk_file)?;
                Ok(format!(
                    "saved {} chunks to {}",
                    outcome.count,
                    outcome.path.display()
                ))
            }
            Stage::Index => {
                let count =
                    run_indexing(self.store, self.embedder, &self.config.chunk_file).await?;
                Ok(format!("indexed {count} products"))
            }
        }
    }

    async fn run_scraper(&self, scraper: &ScraperCommand) -> Result<String, StageError> {
        let status = Command::new("sh")
            .arg("-c")
            .arg(&scraper.command)
            .env("TRAILER_DATA_DIR", &self.config.data_dir)
            .status()
            .await
            .map_err(|source| StageError::Spawn {
                command: scraper.command.clone(),
                source,
            })?;
        if !status.success() {
            return Err(StageError::Exit {
                command: scraper.command.clone(),
                status: status.to_string(),
            });
        }
        Ok(format!("{} finished", scraper.label))
    }
}

fn format_error(err: &StageError) -> String {
    match err {
        StageError::Stage(inner) => format!("{inner:#}"),
        other => other.to_string(),
    }
}
