//! The three pipeline stages

pub mod generation;
pub mod ingestion;
pub mod query;

pub use generation::{EmbeddingGenerationService, GenerationPolicy};
pub use ingestion::IngestionService;
pub use query::{QueryInput, QueryService};
