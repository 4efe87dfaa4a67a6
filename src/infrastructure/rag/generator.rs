//! LLM answer generator

use async_trait::async_trait;
use tracing::{debug, info};

use super::completion::{render_prompt, ModelClient};
use crate::domain::{AnswerGenerator, DomainError};

const GENERATION_PROMPT: &str = r#"You are a helpful AI assistant. Answer the user's QUESTION based *only* on the following SOURCE CONTEXT.

Important guidelines:
- Use ONLY the information provided in the SOURCE CONTEXT
- Do not use any outside information or knowledge
- If the context is not sufficient to answer the question, clearly state that
- Be accurate, concise, and well-structured
- Cite specific parts of the context when relevant

QUESTION:
${question}

SOURCE CONTEXT:
${context}

ANSWER:"#;

#[derive(Debug, Clone)]
pub struct LlmAnswerGenerator {
    client: ModelClient,
}

impl LlmAnswerGenerator {
    pub fn new(client: ModelClient) -> Self {
        info!(model = client.model(), "Answer generator initialized");
        Self { client }
    }

    fn build_prompt(question: &str, context: &str) -> String {
        render_prompt(GENERATION_PROMPT, &[("question", question), ("context", context)])
    }
}

#[async_trait]
impl AnswerGenerator for LlmAnswerGenerator {
    async fn generate(&self, question: &str, context: &str) -> Result<String, DomainError> {
        let request = self
            .client
            .request()
            .user(Self::build_prompt(question, context))
            .build();

        let answer = self.client.complete(request).await?;
        let preview: String = answer.chars().take(100).collect();
        debug!("Generated answer: {}...", preview);

        Ok(answer)
    }
}
