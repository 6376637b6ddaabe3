//! Command-line and environment configuration shared by the binaries.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use crate::chunker::DEFAULT_CHUNK_FILE;
use crate::embedder::{Embedder, OllamaEmbedder, OpenAiEmbedder};
use crate::llm::{CompletionService, OllamaCompletion, OpenAiCompletion};
use crate::pipeline::{PipelineConfig, ScraperCommand};
use crate::store::{CollectionName, PgVectorStore, DEFAULT_COLLECTION};

/// Where raw, merged and chunked data live.
#[derive(Args, Debug, Clone)]
pub struct DataArgs {
    /// Directory holding the per-site scraper output
    #[arg(long, env = "TRAILER_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Directory merged product files are written to
    #[arg(long, env = "TRAILER_MERGED_DIR", default_value = ".")]
    pub merged_dir: PathBuf,

    /// Chunk file produced by the chunker and read by the indexer
    #[arg(long, env = "TRAILER_CHUNK_FILE", default_value = DEFAULT_CHUNK_FILE)]
    pub chunk_file: PathBuf,
}

impl DataArgs {
    /// Pipeline configuration for these paths and the given scraper hooks.
    pub fn pipeline_config(&self, scrapers: &[String]) -> PipelineConfig {
        PipelineConfig {
            scrapers: scrapers.iter().map(|s| ScraperCommand::parse(s)).collect(),
            data_dir: self.data_dir.clone(),
            merged_dir: self.merged_dir.clone(),
            chunk_file: self.chunk_file.clone(),
        }
    }
}

/// Postgres/pgvector connection settings.
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Schema holding collection tables
    #[arg(long, env = "TRAILER_STORE_SCHEMA", default_value = "public")]
    pub schema: String,

    /// Collection (table) name
    #[arg(long, env = "TRAILER_COLLECTION", default_value = DEFAULT_COLLECTION)]
    pub collection: String,
}

impl StoreArgs {
    /// Connects to the configured collection.
    pub async fn connect(&self) -> Result<PgVectorStore> {
        let collection = CollectionName::new(self.schema.clone(), self.collection.clone())?;
        PgVectorStore::connect(&self.database_url, collection).await
    }
}

/// Which service produces embeddings or completions.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum Provider {
    /// Local Ollama server.
    Ollama,
    /// OpenAI or a compatible API.
    Openai,
}

impl Provider {
    /// Base URL used when none is configured.
    pub fn default_url(self) -> &'static str {
        match self {
            Self::Ollama => "http://localhost:11434",
            Self::Openai => "https://api.openai.com/v1",
        }
    }

    fn default_embed_model(self) -> &'static str {
        match self {
            Self::Ollama => "nomic-embed-text",
            Self::Openai => "text-embedding-3-small",
        }
    }

    fn default_llm_model(self) -> &'static str {
        match self {
            Self::Ollama => "llama3",
            Self::Openai => "gpt-4o-mini",
        }
    }
}

/// Embedding provider settings.
#[derive(Args, Debug, Clone)]
pub struct EmbedArgs {
    /// Embedding provider
    #[arg(long, env = "TRAILER_EMBED_PROVIDER", value_enum, default_value = "ollama")]
    pub embed_provider: Provider,

    /// Embedding model name [default: nomic-embed-text, or text-embedding-3-small for openai]
    #[arg(long, env = "TRAILER_EMBED_MODEL")]
    pub embed_model: Option<String>,

    /// Base URL of the embedding service [default: the provider's public endpoint]
    #[arg(long, env = "TRAILER_EMBED_URL")]
    pub embed_url: Option<String>,

    /// API key (OpenAI provider only)
    #[arg(long, env = "OPENAI_API_KEY")]
    pub embed_api_key: Option<String>,

    /// Optional output dimensions (OpenAI provider only)
    #[arg(long, env = "TRAILER_EMBED_DIMENSIONS")]
    pub embed_dimensions: Option<usize>,

    /// Texts sent per embedding request
    #[arg(long, env = "TRAILER_EMBED_BATCH", default_value_t = 32)]
    pub embed_batch: usize,

    /// Request timeout in seconds
    #[arg(long, env = "TRAILER_EMBED_TIMEOUT_SECS", default_value_t = 30)]
    pub embed_timeout_secs: u64,

    /// Attempts per batch before giving up
    #[arg(long, env = "TRAILER_EMBED_MAX_RETRIES", default_value_t = 5)]
    pub embed_max_retries: usize,
}

impl EmbedArgs {
    /// Configured base URL, or the provider's default.
    pub fn base_url(&self) -> &str {
        self.embed_url
            .as_deref()
            .unwrap_or(self.embed_provider.default_url())
    }

    /// Configured model, or the provider's default.
    pub fn model(&self) -> &str {
        self.embed_model
            .as_deref()
            .unwrap_or(self.embed_provider.default_embed_model())
    }

    /// Builds the configured embedder.
    pub fn build(&self) -> Result<Arc<dyn Embedder>> {
        let timeout = Duration::from_secs(self.embed_timeout_secs);
        let embedder: Arc<dyn Embedder> = match self.embed_provider {
            Provider::Ollama => Arc::new(OllamaEmbedder::new(
                self.base_url().to_string(),
                self.model().to_string(),
                timeout,
                self.embed_max_retries,
                self.embed_batch,
            )?),
            Provider::Openai => {
                let api_key = self
                    .embed_api_key
                    .clone()
                    .context("--embed-api-key or OPENAI_API_KEY is required for openai")?;
                Arc::new(OpenAiEmbedder::new(
                    api_key,
                    self.base_url().to_string(),
                    self.model().to_string(),
                    self.embed_dimensions,
                    timeout,
                    self.embed_max_retries,
                    self.embed_batch,
                )?)
            }
        };
        Ok(embedder)
    }
}

/// Completion provider settings.
#[derive(Args, Debug, Clone)]
pub struct LlmArgs {
    /// Completion provider
    #[arg(long, env = "TRAILER_LLM_PROVIDER", value_enum, default_value = "ollama")]
    pub llm_provider: Provider,

    /// Completion model name [default: llama3, or gpt-4o-mini for openai]
    #[arg(long, env = "TRAILER_LLM_MODEL")]
    pub llm_model: Option<String>,

    /// Base URL of the completion service [default: the provider's public endpoint]
    #[arg(long, env = "TRAILER_LLM_URL")]
    pub llm_url: Option<String>,

    /// API key (OpenAI provider only)
    #[arg(long, env = "OPENAI_API_KEY")]
    pub llm_api_key: Option<String>,

    /// Sampling temperature (OpenAI provider only)
    #[arg(long, default_value_t = 0.2)]
    pub temperature: f32,

    /// Maximum completion tokens (OpenAI provider only)
    #[arg(long, default_value_t = 400)]
    pub max_completion_tokens: usize,

    /// Request timeout in seconds
    #[arg(long, env = "TRAILER_LLM_TIMEOUT_SECS", default_value_t = 120)]
    pub llm_timeout_secs: u64,
}

impl LlmArgs {
    /// Configured base URL, or the provider's default.
    pub fn base_url(&self) -> &str {
        self.llm_url
            .as_deref()
            .unwrap_or(self.llm_provider.default_url())
    }

    /// Configured model, or the provider's default.
    pub fn model(&self) -> &str {
        self.llm_model
            .as_deref()
            .unwrap_or(self.llm_provider.default_llm_model())
    }

    /// Builds the configured completion service.
    pub fn build(&self) -> Result<Arc<dyn CompletionService>> {
        let timeout = Duration::from_secs(self.llm_timeout_secs);
        let service: Arc<dyn CompletionService> = match self.llm_provider {
            Provider::Ollama => Arc::new(OllamaCompletion::new(
                self.base_url(),
                self.model().to_string(),
                timeout,
            )?),
            Provider::Openai => Arc::new(OpenAiCompletion::new(
                self.llm_api_key.as_deref().unwrap_or_default(),
                self.base_url(),
                self.model().to_string(),
                self.temperature,
                self.max_completion_tokens,
                timeout,
            )?),
        };
        Ok(service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        data: DataArgs,
        #[command(flatten)]
        embed: EmbedArgs,
        #[command(flatten)]
        llm: LlmArgs,
    }

    #[test]
    fn provider_flags_parse() {
        let cli = TestCli::parse_from([
            "test",
            "--data-dir",
            "scraped",
            "--embed-provider",
            "openai",
            "--llm-model",
            "mistral",
        ]);
        assert_eq!(cli.data.data_dir, PathBuf::from("scraped"));
        assert_eq!(cli.embed.embed_provider, Provider::Openai);
        assert_eq!(cli.llm.model(), "mistral");
    }

    #[test]
    fn default_urls_follow_the_provider() {
        let cli = TestCli::parse_from([
            "test",
            "--embed-provider",
            "openai",
            "--llm-provider",
            "openai",
        ]);
        assert_eq!(cli.embed.base_url(), "https://api.openai.com/v1");
        assert_eq!(cli.embed.model(), "text-embedding-3-small");
        assert_eq!(cli.llm.base_url(), "https://api.openai.com/v1");
        assert_eq!(cli.llm.model(), "gpt-4o-mini");

        let cli = TestCli::parse_from(["test", "--embed-url", "http://gpu-box:11434"]);
        assert_eq!(cli.embed.base_url(), "http://gpu-box:11434");
        assert_eq!(cli.embed.model(), "nomic-embed-text");
        assert_eq!(cli.llm.base_url(), "http://localhost:11434");
        assert_eq!(cli.llm.model(), "llama3");
    }

    #[test]
    fn pipeline_config_parses_scrapers() {
        let cli = TestCli::parse_from(["test", "--chunk-file", "out/chunks.json"]);
        let config = cli.data.pipeline_config(&["ebay=./scrape_ebay.sh".to_string()]);
        assert_eq!(config.chunk_file, PathBuf::from("out/chunks.json"));
        assert_eq!(config.scrapers[0].label, "ebay");
    }
}
