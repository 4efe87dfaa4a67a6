//! LLM groundedness scorer

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use super::completion::{extract_json, render_prompt, ModelClient};
use crate::domain::{AnswerScorer, DomainError, Evaluation};

const EVALUATION_PROMPT: &str = r#"You are an 'Evaluator Agent' assessing the factual consistency of a generated ANSWER.
Your job is to determine if the ANSWER is fully supported by the given SOURCE CONTEXT.

Scoring guidelines:
- Score 5 (Perfect): The ANSWER is fully and verifiably supported by the SOURCE CONTEXT with no hallucinations
- Score 4 (Excellent): The ANSWER is mostly supported with only very minor unsupported details
- Score 3 (Good): The ANSWER is partially supported but contains some unsupported information
- Score 2 (Poor): The ANSWER contains significant information not present in the SOURCE CONTEXT
- Score 1 (Very Poor): The ANSWER is mostly or entirely unsupported by the SOURCE CONTEXT (hallucination)

Additional considerations:
- Answers that honestly state "information not available" should receive high scores if accurate
- Check for factual accuracy, not just semantic similarity
- Be strict but fair

SOURCE CONTEXT:
${context}

GENERATED ANSWER:
${answer}

Respond with a JSON object of the form:
{"score": an integer from 1 to 5, "justification": "a brief explanation for the score"}"#;

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    score: i64,
    #[serde(default)]
    justification: String,
}

/// Scores answers on the 1-5 groundedness rubric.
///
/// A reply outside the rubric is a contract violation and surfaces as
/// `DomainError::InvalidEvaluation` rather than being clamped.
#[derive(Debug, Clone)]
pub struct LlmAnswerScorer {
    client: ModelClient,
}

impl LlmAnswerScorer {
    pub fn new(client: ModelClient) -> Self {
        info!(model = client.model(), "Answer scorer initialized");
        Self { client }
    }

    fn build_prompt(answer: &str, context: &str) -> String {
        render_prompt(EVALUATION_PROMPT, &[("context", context), ("answer", answer)])
    }
}

#[async_trait]
impl AnswerScorer for LlmAnswerScorer {
    async fn score(&self, answer: &str, context: &str) -> Result<Evaluation, DomainError> {
        let request = self
            .client
            .request()
            .user(Self::build_prompt(answer, context))
            .json()
            .build();

        let content = self.client.complete(request).await?;
        let json = extract_json(&content).unwrap_or(&content);
        let response: ScoreResponse = serde_json::from_str(json).map_err(|e| {
            DomainError::invalid_evaluation(format!("Unparseable evaluation response: {}", e))
        })?;

        debug!(
            score = response.score,
            justification = %response.justification,
            "Evaluation received"
        );

        Evaluation::new(response.score, response.justification)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::ModelSettings;
    use crate::domain::llm::MockLlmProvider;

    fn scorer(provider: Arc<MockLlmProvider>) -> LlmAnswerScorer {
        LlmAnswerScorer::new(ModelClient::new(
            provider,
            ModelSettings::new("gpt-4o-mini", 0.0, 200),
        ))
    }

    #[tokio::test]
    async fn test_valid_score() {
        let provider = Arc::new(MockLlmProvider::new("mock").with_reply(
            r#"{"score": 4, "justification": "Mostly supported"}"#,
        ));

        let evaluation = scorer(provider.clone())
            .score("Paris.", "Paris is the capital of France.")
            .await
            .unwrap();

        assert_eq!(evaluation.score(), 4);
        assert_eq!(evaluation.justification(), "Mostly supported");

        let prompt = provider.requests()[0].last_user_content().unwrap().to_string();
        assert!(prompt.contains("GENERATED ANSWER:\nParis."));
    }

    #[tokio::test]
    async fn test_placeholder_in_context_does_not_pull_in_answer() {
        let provider = Arc::new(MockLlmProvider::new("mock").with_reply(
            r#"{"score": 1, "justification": "Unsupported"}"#,
        ));

        scorer(provider.clone())
            .score("HALLUCINATED ANSWER", "doc says ${answer} here")
            .await
            .unwrap();

        let prompt = provider.requests()[0].last_user_content().unwrap().to_string();
        assert_eq!(prompt.matches("HALLUCINATED ANSWER").count(), 1);
        assert!(prompt.contains("SOURCE CONTEXT:\ndoc says ${answer} here"));
    }

    #[tokio::test]
    async fn test_out_of_range_score_is_invalid_evaluation() {
        for reply in [
            r#"{"score": 0, "justification": "x"}"#,
            r#"{"score": 6, "justification": "x"}"#,
        ] {
            let provider = Arc::new(MockLlmProvider::new("mock").with_reply(reply));

            let err = scorer(provider).score("a", "c").await.unwrap_err();

            assert!(matches!(err, DomainError::InvalidEvaluation { .. }), "{}", reply);
        }
    }

    #[tokio::test]
    async fn test_unparseable_reply_is_invalid_evaluation() {
        let provider = Arc::new(MockLlmProvider::new("mock").with_reply("I'd say four"));

        let err = scorer(provider).score("a", "c").await.unwrap_err();

        assert!(matches!(err, DomainError::InvalidEvaluation { .. }));
    }

    #[tokio::test]
    async fn test_provider_failure_stays_provider_error() {
        let provider = Arc::new(MockLlmProvider::new("mock").with_error("rate limited"));

        let err = scorer(provider).score("a", "c").await.unwrap_err();

        assert!(matches!(err, DomainError::Provider { .. }));
    }
}
