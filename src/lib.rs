//! Self-correcting retrieval-augmented question answering
//!
//! Retrieves candidate passages, filters them for relevance, generates an
//! answer from the surviving context only, scores its groundedness and retries
//! until the score clears a threshold or the attempt budget runs out.

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use api::state::AppState;
use domain::{DomainError, LlmProvider, MetricsSink, Retriever};
use infrastructure::{
    llm::{HttpClient, OpenAiProvider},
    metrics::{FanoutMetricsSink, MetricsCollector},
    observability::PrometheusMetricsSink,
    rag::{LlmAnswerGenerator, LlmAnswerScorer, LlmRelevanceClassifier, ModelClient, RagPipeline},
    retrieval::{CorpusLoader, InMemoryRetriever},
};
use tracing::info;

/// Create the application state from configuration, using the configured LLM endpoint
pub fn create_app_state_with_config(
    config: &AppConfig,
    retriever: Arc<dyn Retriever>,
) -> anyhow::Result<AppState> {
    let provider = create_llm_provider(config)?;
    Ok(create_app_state(config, retriever, provider)?)
}

/// Wire the pipeline, its model-backed collaborators and the metrics sinks
pub fn create_app_state(
    config: &AppConfig,
    retriever: Arc<dyn Retriever>,
    provider: Arc<dyn LlmProvider>,
) -> Result<AppState, DomainError> {
    info!(
        retriever = retriever.retriever_name(),
        provider = provider.provider_name(),
        "Building RAG pipeline"
    );

    let classifier = LlmRelevanceClassifier::new(ModelClient::new(
        provider.clone(),
        config.models.guardrail.clone(),
    ));
    let generator = LlmAnswerGenerator::new(ModelClient::new(
        provider.clone(),
        config.models.generate.clone(),
    ));
    let scorer =
        LlmAnswerScorer::new(ModelClient::new(provider, config.models.evaluate.clone()));

    let collector = Arc::new(
        MetricsCollector::new(
            config.monitoring.enabled,
            config.monitoring.metrics_file.as_ref().map(PathBuf::from),
        )
        .with_max_records(config.monitoring.max_records),
    );

    let mut sink = FanoutMetricsSink::new().with_sink(collector.clone());
    if config.observability.metrics.enabled {
        sink = sink.with_sink(Arc::new(PrometheusMetricsSink::new()));
    }
    let sink: Arc<dyn MetricsSink> = Arc::new(sink);

    let pipeline = RagPipeline::new(
        config.rag.clone(),
        retriever,
        Arc::new(classifier),
        Arc::new(generator),
        Arc::new(scorer),
        sink,
    )?;

    Ok(AppState::new(Arc::new(pipeline), collector))
}

/// OpenAI-compatible provider from the `llm` section; the API key must be set
pub fn create_llm_provider(config: &AppConfig) -> Result<Arc<dyn LlmProvider>, DomainError> {
    let api_key = config.api_key().ok_or_else(|| {
        DomainError::configuration(format!(
            "{} environment variable is required",
            config.llm.api_key_env
        ))
    })?;

    let client = HttpClient::with_timeout(Duration::from_secs(config.llm.request_timeout_secs))?;
    info!(base_url = %config.llm.base_url, "Using OpenAI-compatible provider");

    Ok(Arc::new(OpenAiProvider::with_base_url(
        client,
        api_key,
        &config.llm.base_url,
    )))
}

/// Load a corpus from disk into the in-memory lexical retriever
pub fn load_retriever(
    config: &AppConfig,
    corpus: impl AsRef<Path>,
) -> Result<Arc<dyn Retriever>, DomainError> {
    let passages = CorpusLoader::new().load(corpus)?;
    info!(passages = passages.len(), "Corpus loaded");

    Ok(Arc::new(InMemoryRetriever::new(
        passages,
        config.retrieval.top_k,
    )))
}
