//! 检索协作方：文档分块、进程内索引、检索统计

pub mod chunker;
pub mod index;
pub mod metrics;

pub use chunker::{chunk_words, clean_text, Chunk, Chunker, ChunkingConfig};
pub use index::{InMemoryIndex, ScoredChunk, VectorIndex};
pub use metrics::{hit_rate, rouge_l, ScoreStats};
