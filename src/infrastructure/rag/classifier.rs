//! LLM relevance classifier (guardrail)

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use super::completion::{render_prompt, ModelClient};
use crate::domain::{DomainError, RelevanceClassifier, RelevanceVerdict};

const GUARDRAIL_PROMPT: &str = r#"You are a 'Guardrail Agent' acting as a relevance filter.
Your job is to determine if the following CONTEXT is relevant for answering the user's QUESTION.

Guidelines:
- Respond with 'is_relevant: true' if the context contains information that can help answer the question
- Respond with 'is_relevant: false' if the context is completely unrelated
- Be strict but reasonable - partial relevance should be marked as relevant
- Consider semantic similarity, not just keyword matching

QUESTION:
${question}

CONTEXT:
${context}

Respond with a JSON object of the form:
{"is_relevant": true or false, "justification": "a brief explanation for the relevance decision"}"#;

#[derive(Debug, Deserialize)]
struct GuardrailCheck {
    is_relevant: bool,
    #[serde(default)]
    justification: String,
}

/// Asks a model whether a passage helps answer a question
#[derive(Debug, Clone)]
pub struct LlmRelevanceClassifier {
    client: ModelClient,
}

impl LlmRelevanceClassifier {
    pub fn new(client: ModelClient) -> Self {
        info!(model = client.model(), "Relevance classifier initialized");
        Self { client }
    }

    fn build_prompt(question: &str, passage_text: &str) -> String {
        render_prompt(
            GUARDRAIL_PROMPT,
            &[("question", question), ("context", passage_text)],
        )
    }
}

#[async_trait]
impl RelevanceClassifier for LlmRelevanceClassifier {
    async fn classify(
        &self,
        question: &str,
        passage_text: &str,
    ) -> Result<RelevanceVerdict, DomainError> {
        let request = self
            .client
            .request()
            .user(Self::build_prompt(question, passage_text))
            .json()
            .build();

        let check: GuardrailCheck = self.client.complete_json(request).await?;

        Ok(RelevanceVerdict {
            is_relevant: check.is_relevant,
            justification: check.justification,
        })
    }
}
