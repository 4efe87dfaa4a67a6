//! Infrastructure layer - External service implementations

pub mod llm;
pub mod logging;
pub mod metrics;
pub mod observability;
pub mod rag;
pub mod retrieval;
