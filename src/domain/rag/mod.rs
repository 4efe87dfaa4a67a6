//! Self-correcting answer pipeline domain
//!
//! Question validation, relevance filtering of retrieved passages, context
//! assembly and the bounded generate/score correction loop. Orchestration
//! lives in `infrastructure::rag::pipeline`.

mod agents;
mod config;
mod context;
mod correction;
mod deadline;
mod filter;
mod question;
mod result;
mod types;

pub use agents::{AnswerGenerator, AnswerScorer, RelevanceClassifier};
pub use config::RagConfig;
pub use context::{truncate_context, ContextAssembler, PASSAGE_SEPARATOR, TRUNCATION_MARKER};
pub use correction::{AttemptTracker, CorrectionController, Decision};
pub use deadline::with_deadline;
pub use filter::{FilterOutcome, RelevanceFilter};
pub use question::Question;
pub use result::{PipelineResult, NO_INFORMATION_ANSWER};
pub use types::{Attempt, Evaluation, RelevanceVerdict, MAX_SCORE, MIN_SCORE};

#[cfg(test)]
pub use agents::mock;
