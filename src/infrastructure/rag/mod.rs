//! Answer pipeline orchestration and its model-backed collaborators

mod classifier;
mod completion;
mod generator;
mod pipeline;
mod scorer;

pub use classifier::LlmRelevanceClassifier;
pub use completion::{extract_json, ModelClient};
pub use generator::LlmAnswerGenerator;
pub use pipeline::RagPipeline;
pub use scorer::LlmAnswerScorer;
