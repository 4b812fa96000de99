//! ragwatch-recall - Error knowledge base and fix ranking
//!
//! Stores pipeline errors with embeddings and their fixes, answers
//! similarity queries over them, and ranks past fixes for new errors by a
//! blend of similarity and observed success rate.

pub mod config;
pub mod embedder;
pub mod export;
pub mod index;
pub mod knowledge;
pub mod ranker;
pub mod store;
pub mod types;

pub use config::{KnowledgeConfig, RankerConfig};
pub use embedder::{CharCodeEmbedder, Embedder, EmbedderError, EmbedderResult, cosine_similarity};
pub use export::{ImportStats, KnowledgeExport};
pub use index::{InMemoryVectorIndex, IndexEntry, IndexMatch, IndexMetadata, MetadataFilter, VectorIndex};
pub use knowledge::KnowledgeBase;
pub use ranker::{FixRanker, LoggingNoveltyObserver, NoveltyObserver};
pub use store::{ErrorStore, InMemoryErrorStore};
pub use types::*;
