//! Retriever contract

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use super::Passage;
use crate::domain::DomainError;

/// Returns candidate passages for a question, best first.
///
/// Implementations are long-lived and shared across concurrent queries, so
/// they must be safe for concurrent read access.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Retrieve an ordered list of candidate passages
    async fn retrieve(&self, question: &str) -> Result<Vec<Passage>, DomainError>;

    /// Short name used in logs
    fn retriever_name(&self) -> &'static str;
}
