//! Per-call timeout for external collaborators

use std::future::Future;
use std::time::Duration;

use crate::domain::DomainError;

/// Run `call`, converting an elapsed timeout into `DomainError::Timeout`
pub async fn with_deadline<T, F>(operation: &str, limit: Duration, call: F) -> Result<T, DomainError>
where
    F: Future<Output = Result<T, DomainError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(DomainError::timeout(operation, limit)),
    }
}
