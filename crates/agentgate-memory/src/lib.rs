pub mod ring;
pub mod sentiment;
pub mod types;

pub use sentiment::SentimentScorer;
pub use types::{MemoryEntry, Role};
