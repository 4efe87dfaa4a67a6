//! Shared model-call plumbing for the LLM-backed collaborators

use std::sync::Arc;
use std::time::Instant;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::ModelSettings;
use crate::domain::{DomainError, LlmProvider, LlmRequest, LlmRequestBuilder};
use crate::infrastructure::observability::{record_llm_request, LlmRequestMetricParams};

/// `${name}` placeholders in the prompt templates
static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{([a-z_]+)\}").unwrap());

/// A provider bound to one model and its sampling settings
#[derive(Debug, Clone)]
pub struct ModelClient {
    provider: Arc<dyn LlmProvider>,
    settings: ModelSettings,
}

impl ModelClient {
    pub fn new(provider: Arc<dyn LlmProvider>, settings: ModelSettings) -> Self {
        Self { provider, settings }
    }

    pub fn model(&self) -> &str {
        &self.settings.name
    }

    /// Request builder pre-filled with this model's temperature and token limit
    pub fn request(&self) -> LlmRequestBuilder {
        LlmRequest::builder()
            .temperature(self.settings.temperature)
            .max_tokens(self.settings.max_tokens)
    }

    /// Send `request` and return the non-empty completion text
    pub async fn complete(&self, request: LlmRequest) -> Result<String, DomainError> {
        let started = Instant::now();
        let result = self.provider.chat(&self.settings.name, request).await;

        let usage = result.as_ref().ok().and_then(|r| r.usage.clone());
        record_llm_request(LlmRequestMetricParams {
            provider: self.provider.provider_name(),
            model: &self.settings.name,
            duration: started.elapsed(),
            success: result.is_ok(),
            input_tokens: usage.as_ref().map(|u| u.prompt_tokens as u64),
            output_tokens: usage.as_ref().map(|u| u.completion_tokens as u64),
        });

        let response = result?;
        debug!(
            model = %self.settings.name,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Model call complete"
        );

        response
            .content()
            .map(str::to_string)
            .ok_or_else(|| {
                DomainError::provider(self.provider.provider_name(), "Empty response from LLM")
            })
    }

    /// Send `request` and decode the JSON object in the completion
    pub async fn complete_json<T: DeserializeOwned>(
        &self,
        request: LlmRequest,
    ) -> Result<T, DomainError> {
        let content = self.complete(request).await?;
        let json = extract_json(&content).unwrap_or(&content);

        serde_json::from_str(json).map_err(|e| {
            warn!("Failed to parse structured response: {} - Response: {}", e, content);
            DomainError::provider(
                self.provider.provider_name(),
                format!("Invalid structured response: {}", e),
            )
        })
    }
}

/// Fill `${name}` placeholders in one pass over `template`.
///
/// Substituted values are never rescanned, so a value that itself contains
/// `${...}` is inserted literally. Unknown placeholders are left as written.
pub fn render_prompt(template: &str, values: &[(&str, &str)]) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            let name = &caps[1];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Extract JSON object from a string (handles markdown code blocks and prose)
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;

    if start < end {
        Some(&text[start..=end])
    } else {
        None
    }
}
