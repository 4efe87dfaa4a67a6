//! Domain layer - Core business logic and entities

pub mod error;
pub mod llm;
pub mod metrics;
pub mod rag;
pub mod retrieval;

pub use error::DomainError;
pub use llm::{
    FinishReason, LlmProvider, LlmRequest, LlmRequestBuilder, LlmResponse, LlmResponseFormat,
    Message, MessageRole, Usage,
};
pub use metrics::{AggregateMetrics, MetricsSink, NoopMetricsSink, QueryMetrics};
pub use rag::{
    AnswerGenerator, AnswerScorer, Attempt, ContextAssembler, CorrectionController, Evaluation,
    FilterOutcome, PipelineResult, Question, RagConfig, RelevanceClassifier, RelevanceFilter,
    RelevanceVerdict,
};
pub use retrieval::{Passage, Retriever};
