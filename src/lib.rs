#![warn(missing_docs)]
//! Trailer parts catalog: merge scraped listings, chunk them, index them in
//! pgvector and answer questions grounded in the nearest matches.

pub mod answer;
pub mod chunker;
pub mod config;
pub mod embedder;
pub mod files;
pub mod index;
pub mod llm;
pub mod logging;
pub mod merge;
pub mod normalizer;
pub mod pipeline;
pub mod product;
pub mod query;
pub mod server;
pub mod session;
pub mod sites;
pub mod store;

pub use answer::{answer, compose, NO_MATCHES_ANSWER};
pub use chunker::{chunk, Chunk};
pub use embedder::Embedder;
pub use index::rebuild_index;
pub use llm::{CompletionError, CompletionService};
pub use merge::{merge, MergeReport};
pub use normalizer::{normalize, Normalizer};
pub use pipeline::{Pipeline, PipelineConfig, PipelineReport, StageStatus};
pub use product::{Product, ProductRecord, PLACEHOLDER_IMAGE_URL};
pub use query::{QueryResult, QueryService, DEFAULT_TOP_K};
pub use session::{Session, SessionStore};
pub use sites::{SiteSpec, SITES};
pub use store::{ChunkMetadata, IndexEntry, VectorStore};
