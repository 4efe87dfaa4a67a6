//! Query endpoint request types

use serde::{Deserialize, Serialize};

/// Body of `POST /v1/query`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    /// Caller-supplied id; a UUID is generated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_id: Option<String>,
}
