//! Self-correcting RAG pipeline orchestrator
//!
//! Runs one question through validation, retrieval, relevance filtering,
//! context assembly and the correction loop. Every exit path, including
//! errors and panics inside collaborators, produces a [`PipelineResult`] and
//! exactly one metrics record.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::domain::metrics::elapsed_ms;
use crate::domain::rag::with_deadline;
use crate::domain::{
    AnswerGenerator, AnswerScorer, ContextAssembler, CorrectionController, DomainError,
    MetricsSink, Passage, PipelineResult, QueryMetrics, Question, RagConfig,
    RelevanceClassifier, RelevanceFilter, Retriever,
};

/// Orchestrates retrieval, guardrail filtering and self-correcting generation
pub struct RagPipeline {
    config: RagConfig,
    retriever: Arc<dyn Retriever>,
    filter: RelevanceFilter,
    assembler: ContextAssembler,
    correction: CorrectionController,
    sink: Arc<dyn MetricsSink>,
}

impl std::fmt::Debug for RagPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagPipeline")
            .field("config", &self.config)
            .field("sink", &self.sink.sink_name())
            .finish_non_exhaustive()
    }
}

impl RagPipeline {
    /// Build a pipeline, rejecting invalid configuration
    pub fn new(
        config: RagConfig,
        retriever: Arc<dyn Retriever>,
        classifier: Arc<dyn RelevanceClassifier>,
        generator: Arc<dyn AnswerGenerator>,
        scorer: Arc<dyn AnswerScorer>,
        sink: Arc<dyn MetricsSink>,
    ) -> Result<Self, DomainError> {
        config.validate()?;

        let timeout = config.call_timeout();
        let filter = RelevanceFilter::new(classifier, timeout, config.max_concurrent_checks);
        let assembler = ContextAssembler::new(config.max_context_length);
        let correction = CorrectionController::new(generator, scorer, timeout);

        info!(
            max_attempts = config.max_correction_attempts,
            min_score = config.min_acceptable_score,
            guardrail = config.guardrail_enabled,
            parallel = config.parallel_guardrail_checks,
            "RAG pipeline initialized"
        );

        Ok(Self {
            config,
            retriever,
            filter,
            assembler,
            correction,
            sink,
        })
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Answer `question`; never fails, errors are reported inside the result.
    ///
    /// A UUID v4 query id is generated when none is supplied.
    pub async fn run(&self, question: &str, query_id: Option<String>) -> PipelineResult {
        let query_id = query_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let span = info_span!("rag_query", query_id = %query_id);

        self.run_query(question, query_id).instrument(span).await
    }

    async fn run_query(&self, raw_question: &str, query_id: String) -> PipelineResult {
        let started = Instant::now();
        let mut metrics = QueryMetrics::new(query_id, raw_question);

        info!(question = %raw_question, "Starting RAG pipeline");

        let result = match Question::parse(
            raw_question,
            self.config.max_query_length,
            self.config.enable_sanitization,
        ) {
            Err(e) => self.failure(raw_question, e, &metrics),
            Ok(question) => {
                let outcome = AssertUnwindSafe(self.answer(&question, &mut metrics))
                    .catch_unwind()
                    .await;

                match outcome {
                    Ok(Ok(result)) => result,
                    Ok(Err(e)) => self.failure(question.as_str(), e, &metrics),
                    Err(panic) => {
                        let e = DomainError::internal(panic_message(panic.as_ref()));
                        self.failure(question.as_str(), e, &metrics)
                    }
                }
            }
        };

        metrics.total_latency_ms = elapsed_ms(started);
        metrics.success = result.success;
        metrics.final_score = result.score;
        metrics.error_message = result.error_message.clone();
        self.emit(&metrics);

        info!(
            score = result.score,
            attempts = result.correction_attempts,
            success = result.success,
            total_ms = metrics.total_latency_ms as u64,
            "Pipeline completed"
        );

        result
    }

    async fn answer(
        &self,
        question: &Question,
        metrics: &mut QueryMetrics,
    ) -> Result<PipelineResult, DomainError> {
        let q = question.as_str();

        let passages = self.retrieve(q, metrics).await?;
        let retrieved = passages.len();
        metrics.set_document_counts(retrieved, retrieved);

        if passages.is_empty() {
            warn!("No documents retrieved");
            return Ok(PipelineResult::no_documents(q));
        }

        let relevant = if self.config.guardrail_enabled {
            info!("Filtering documents for relevance");
            let started = Instant::now();
            let outcome = self
                .filter
                .filter(q, passages, self.config.parallel_guardrail_checks)
                .await;
            metrics.guardrail_latency_ms = elapsed_ms(started);
            metrics.set_document_counts(retrieved, outcome.relevant.len());

            info!(
                "Filtered to {}/{} relevant documents",
                outcome.relevant.len(),
                retrieved
            );

            if outcome.relevant.is_empty() {
                warn!("No relevant documents after filtering");
                return Ok(PipelineResult::no_relevant_documents(q, retrieved));
            }
            outcome.relevant
        } else {
            passages
        };

        let context = self.assembler.assemble(&relevant);

        let attempt = self
            .correction
            .run(
                q,
                &context,
                self.config.max_correction_attempts,
                self.config.min_acceptable_score,
                metrics,
            )
            .await?;

        Ok(PipelineResult::from_attempt(
            q,
            attempt,
            context,
            retrieved,
            relevant.len(),
            metrics.correction_attempts,
        ))
    }

    async fn retrieve(
        &self,
        question: &str,
        metrics: &mut QueryMetrics,
    ) -> Result<Vec<Passage>, DomainError> {
        info!("Retrieving documents");
        let started = Instant::now();
        let result = with_deadline(
            "Document retrieval",
            self.config.call_timeout(),
            self.retriever.retrieve(question),
        )
        .await;
        metrics.retrieval_latency_ms = elapsed_ms(started);

        let passages = result.map_err(|e| match e {
            DomainError::Retrieval { .. } => e,
            other => DomainError::retrieval(other.to_string()),
        })?;

        info!(count = passages.len(), "Retrieved documents");
        Ok(passages)
    }

    fn failure(&self, question: &str, e: DomainError, metrics: &QueryMetrics) -> PipelineResult {
        if e.is_validation() {
            warn!(error = %e, "Question rejected");
        } else {
            error!(error = %e, "Pipeline failed");
        }

        PipelineResult::failed(
            question,
            e.to_string(),
            metrics.documents_retrieved,
            metrics.documents_after_filter,
            metrics.correction_attempts,
        )
    }

    fn emit(&self, metrics: &QueryMetrics) {
        if let Err(e) = self.sink.emit(metrics) {
            warn!(sink = self.sink.sink_name(), error = %e, "Failed to record query metrics");
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());

    format!("Pipeline stage panicked: {}", detail)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::domain::metrics::MockMetricsSink;
    use crate::domain::rag::mock::{MockAnswerGenerator, MockAnswerScorer, MockRelevanceClassifier};
    use crate::domain::retrieval::MockRetriever;
    use crate::domain::NoopMetricsSink;
    use crate::infrastructure::metrics::MetricsCollector;

    struct Harness {
        retriever: MockRetriever,
        classifier: MockRelevanceClassifier,
        generator: MockAnswerGenerator,
        scorer: MockAnswerScorer,
        config: RagConfig,
    }

    struct Built {
        pipeline: RagPipeline,
        classifier: Arc<MockRelevanceClassifier>,
        generator: Arc<MockAnswerGenerator>,
        scorer: Arc<MockAnswerScorer>,
        collector: Arc<MetricsCollector>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                retriever: MockRetriever::new(),
                classifier: MockRelevanceClassifier::new(),
                generator: MockAnswerGenerator::new(),
                scorer: MockAnswerScorer::scoring([5, 5, 5]),
                config: RagConfig::default(),
            }
        }

        fn passages(mut self, texts: &[&str]) -> Self {
            let passages: Vec<Passage> = texts.iter().map(|t| Passage::new(*t)).collect();
            self.retriever
                .expect_retrieve()
                .times(1)
                .returning(move |_| Ok(passages.clone()));
            self
        }

        fn build(self) -> Built {
            let classifier = Arc::new(self.classifier);
            let generator = Arc::new(self.generator);
            let scorer = Arc::new(self.scorer);
            let collector = Arc::new(MetricsCollector::in_memory());

            let pipeline = RagPipeline::new(
                self.config,
                Arc::new(self.retriever),
                classifier.clone(),
                generator.clone(),
                scorer.clone(),
                collector.clone(),
            )
            .unwrap();

            Built {
                pipeline,
                classifier,
                generator,
                scorer,
                collector,
            }
        }
    }

    impl Built {
        fn only_record(&self) -> QueryMetrics {
            let records = self.collector.records().unwrap();
            assert_eq!(records.len(), 1, "exactly one metrics record per run");
            records.into_iter().next().unwrap()
        }
    }

    #[tokio::test]
    async fn test_successful_run() {
        let mut h = Harness::new().passages(&["Paris is the capital of France."]);
        h.generator = MockAnswerGenerator::answering(["Paris."]);
        h.scorer = MockAnswerScorer::scoring([5]);
        let built = h.build();

        let result = built
            .pipeline
            .run("What is the capital of France?", Some("q-42".to_string()))
            .await;

        assert!(result.success);
        assert_eq!(result.answer, "Paris.");
        assert_eq!(result.score, 5);
        assert_eq!(result.source_context, "Paris is the capital of France.");
        assert_eq!(result.documents_retrieved, 1);
        assert_eq!(result.documents_after_filter, 1);
        assert_eq!(result.correction_attempts, 1);

        let record = built.only_record();
        assert_eq!(record.query_id, "q-42");
        assert!(record.success);
        assert_eq!(record.final_score, 5);
        assert_eq!(record.correction_attempts, 1);
    }

    #[tokio::test]
    async fn test_generates_query_id_when_missing() {
        let built = Harness::new().passages(&["p"]).build();

        built.pipeline.run("question", None).await;

        let record = built.only_record();
        assert!(Uuid::parse_str(&record.query_id).is_ok());
    }

    #[tokio::test]
    async fn test_early_accept_stops_generation() {
        let mut h = Harness::new().passages(&["ctx"]);
        h.generator = MockAnswerGenerator::answering(["first", "second", "third"]);
        h.scorer = MockAnswerScorer::scoring([2, 4, 5]);
        let built = h.build();

        let result = built.pipeline.run("question", None).await;

        assert_eq!(built.generator.call_count(), 2);
        assert_eq!(result.answer, "second");
        assert_eq!(result.score, 4);
        assert_eq!(result.correction_attempts, 2);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_best_attempt() {
        let mut h = Harness::new().passages(&["ctx"]);
        h.generator = MockAnswerGenerator::answering(["a1", "a2", "a3"]);
        h.scorer = MockAnswerScorer::scoring([2, 1, 2]);
        let built = h.build();

        let result = built.pipeline.run("question", None).await;

        assert!(result.success);
        assert_eq!(result.answer, "a1");
        assert_eq!(result.score, 2);
        assert_eq!(result.correction_attempts, 3);
        assert_eq!(built.generator.call_count(), 3);
    }

    #[tokio::test]
    async fn test_no_documents_short_circuits() {
        let built = Harness::new().passages(&[]).build();

        let result = built.pipeline.run("question", None).await;

        assert!(!result.success);
        assert_eq!(result.score, 0);
        assert_eq!(result.correction_attempts, 0);
        assert_eq!(result.score_justification, "No documents retrieved");
        assert_eq!(built.classifier.call_count(), 0);
        assert_eq!(built.generator.call_count(), 0);
        assert_eq!(built.scorer.call_count(), 0);

        let record = built.only_record();
        assert!(!record.success);
        assert_eq!(record.documents_retrieved, 0);
    }

    #[tokio::test]
    async fn test_all_irrelevant_short_circuits() {
        let mut h = Harness::new().passages(&["a", "b", "c"]);
        h.classifier = MockRelevanceClassifier::new()
            .irrelevant("a")
            .irrelevant("b")
            .irrelevant("c");
        let built = h.build();

        let result = built.pipeline.run("question", None).await;

        assert!(!result.success);
        assert_eq!(result.documents_retrieved, 3);
        assert_eq!(result.documents_after_filter, 0);
        assert_eq!(
            result.score_justification,
            "No relevant context found after filtering"
        );
        assert_eq!(built.generator.call_count(), 0);

        let record = built.only_record();
        assert_eq!(record.documents_retrieved, 3);
        assert_eq!(record.filter_rejection_rate, 1.0);
    }

    #[tokio::test]
    async fn test_filter_keeps_order_and_counts() {
        let mut h = Harness::new().passages(&["one", "two", "three"]);
        h.classifier = MockRelevanceClassifier::new().irrelevant("two");
        let built = h.build();

        let result = built.pipeline.run("question", None).await;

        assert!(result.success);
        assert_eq!(result.source_context, "one\n\n---\n\nthree");
        assert_eq!(result.documents_retrieved, 3);
        assert_eq!(result.documents_after_filter, 2);
    }

    #[tokio::test]
    async fn test_sequential_filter_matches_concurrent() {
        let mut h = Harness::new().passages(&["one", "two", "three"]);
        h.classifier = MockRelevanceClassifier::new().irrelevant("one");
        h.config = RagConfig::default().with_parallel_checks(false);
        let built = h.build();

        let result = built.pipeline.run("question", None).await;

        assert_eq!(result.source_context, "two\n\n---\n\nthree");
        assert_eq!(built.classifier.call_count(), 3);
    }

    #[tokio::test]
    async fn test_run_can_be_spawned_on_runtime() {
        let mut h = Harness::new().passages(&["one", "two", "three", "four"]);
        h.classifier = MockRelevanceClassifier::new().irrelevant("three");
        h.config = RagConfig::default()
            .with_parallel_checks(true)
            .with_max_concurrent_checks(2);
        let built = h.build();
        let pipeline = Arc::new(built.pipeline);

        let handle = tokio::spawn({
            let pipeline = pipeline.clone();
            async move { pipeline.run("question", None).await }
        });
        let result = handle.await.unwrap();

        assert!(result.success);
        assert_eq!(result.source_context, "one\n\n---\n\ntwo\n\n---\n\nfour");
        assert_eq!(result.documents_after_filter, 3);
        assert_eq!(built.classifier.call_count(), 4);
    }

    #[tokio::test]
    async fn test_classifier_failures_fail_open() {
        let mut h = Harness::new().passages(&["x", "y"]);
        h.classifier = MockRelevanceClassifier::new()
            .failing("x", "timeout")
            .failing("y", "timeout");
        let built = h.build();

        let result = built.pipeline.run("question", None).await;

        assert!(result.success);
        assert_eq!(result.documents_after_filter, 2);
        assert_eq!(built.generator.call_count(), 1);
    }

    #[tokio::test]
    async fn test_guardrail_disabled_skips_classifier() {
        let mut h = Harness::new().passages(&["a", "b"]);
        h.classifier = MockRelevanceClassifier::new().irrelevant("a").irrelevant("b");
        h.config = RagConfig::default().with_guardrail(false);
        let built = h.build();

        let result = built.pipeline.run("question", None).await;

        assert!(result.success);
        assert_eq!(result.documents_after_filter, 2);
        assert_eq!(built.classifier.call_count(), 0);
        assert_eq!(built.only_record().guardrail_latency_ms, 0.0);
    }

    #[tokio::test]
    async fn test_empty_question_rejected_before_retrieval() {
        let mut h = Harness::new();
        h.retriever.expect_retrieve().times(0);
        let built = h.build();

        let result = built.pipeline.run("   \n\t ", None).await;

        assert!(!result.success);
        assert!(result.error_message.unwrap().contains("Query cannot be empty"));
        assert_eq!(built.generator.call_count(), 0);
        assert!(!built.only_record().success);
    }

    #[tokio::test]
    async fn test_overlong_question_rejected() {
        let mut h = Harness::new();
        h.retriever.expect_retrieve().times(0);
        h.config = RagConfig::default().with_max_query_length(10);
        let built = h.build();

        let result = built.pipeline.run("this question is too long", None).await;

        assert!(!result.success);
        assert!(result
            .error_message
            .unwrap()
            .contains("Query exceeds maximum length of 10 characters"));
        built.only_record();
    }

    #[tokio::test]
    async fn test_sanitized_question_reaches_retriever() {
        let mut h = Harness::new();
        h.retriever
            .expect_retrieve()
            .withf(|q| q == "capital of France")
            .times(1)
            .returning(|_| Ok(vec![Passage::new("Paris")]));
        let built = h.build();

        let result = built.pipeline.run("  capital\u{0}  of\n\nFrance  ", None).await;

        assert_eq!(result.question, "capital of France");
    }

    #[tokio::test]
    async fn test_retrieval_failure_is_reported() {
        let mut h = Harness::new();
        h.retriever
            .expect_retrieve()
            .times(1)
            .returning(|_| Err(DomainError::storage("index offline")));
        let built = h.build();

        let result = built.pipeline.run("question", None).await;

        assert!(!result.success);
        assert_eq!(result.score, 0);
        assert_eq!(result.score_justification, "Pipeline execution failed");
        let message = result.error_message.unwrap();
        assert!(message.starts_with("Document retrieval failed:"));
        assert!(message.contains("index offline"));
        assert!(result.answer.starts_with("Error: "));

        let record = built.only_record();
        assert!(!record.success);
        assert!(record.error_message.is_some());
    }

    #[tokio::test]
    async fn test_generation_failure_keeps_observed_counts() {
        let mut h = Harness::new().passages(&["a", "b"]);
        h.generator = MockAnswerGenerator::answering(["first"]);
        h.scorer = MockAnswerScorer::scoring([1]);
        let built = h.build();

        // Scorer has one scripted score; the second evaluation fails
        let result = built.pipeline.run("question", None).await;

        assert!(!result.success);
        assert_eq!(result.documents_retrieved, 2);
        assert_eq!(result.documents_after_filter, 2);
        assert_eq!(result.correction_attempts, 1);
        assert_eq!(built.only_record().correction_attempts, 1);
    }

    #[tokio::test]
    async fn test_invalid_score_fails_query() {
        let mut h = Harness::new().passages(&["a"]);
        h.scorer = MockAnswerScorer::scoring([9]);
        let built = h.build();

        let result = built.pipeline.run("question", None).await;

        assert!(!result.success);
        assert!(result.error_message.unwrap().contains("Invalid evaluation"));
    }

    #[derive(Debug)]
    struct PanickingGenerator;

    #[async_trait]
    impl AnswerGenerator for PanickingGenerator {
        async fn generate(&self, _question: &str, _context: &str) -> Result<String, DomainError> {
            panic!("generator exploded");
        }
    }

    #[tokio::test]
    async fn test_panicking_collaborator_still_returns_result() {
        let mut retriever = MockRetriever::new();
        retriever
            .expect_retrieve()
            .returning(|_| Ok(vec![Passage::new("ctx")]));
        let collector = Arc::new(MetricsCollector::in_memory());

        let pipeline = RagPipeline::new(
            RagConfig::default(),
            Arc::new(retriever),
            Arc::new(MockRelevanceClassifier::new()),
            Arc::new(PanickingGenerator),
            Arc::new(MockAnswerScorer::scoring([5])),
            collector.clone(),
        )
        .unwrap();

        let result = pipeline.run("question", None).await;

        assert!(!result.success);
        assert!(result.error_message.unwrap().contains("generator exploded"));
        assert_eq!(collector.len(), 1);
    }

    #[tokio::test]
    async fn test_exactly_one_emit_per_path() {
        let paths: Vec<(&str, Vec<&str>)> = vec![
            ("", vec![]),
            ("question", vec![]),
            ("question", vec!["relevant passage"]),
        ];

        for (question, texts) in paths {
            let mut retriever = MockRetriever::new();
            let passages: Vec<Passage> = texts.iter().map(|t| Passage::new(*t)).collect();
            retriever
                .expect_retrieve()
                .returning(move |_| Ok(passages.clone()));

            let mut sink = MockMetricsSink::new();
            sink.expect_emit().times(1).returning(|_| Ok(()));
            sink.expect_sink_name().return_const("mock");

            let pipeline = RagPipeline::new(
                RagConfig::default(),
                Arc::new(retriever),
                Arc::new(MockRelevanceClassifier::new()),
                Arc::new(MockAnswerGenerator::new()),
                Arc::new(MockAnswerScorer::scoring([5])),
                Arc::new(sink),
            )
            .unwrap();

            pipeline.run(question, None).await;
        }
    }

    #[tokio::test]
    async fn test_sink_failure_does_not_fail_query() {
        let mut retriever = MockRetriever::new();
        retriever
            .expect_retrieve()
            .returning(|_| Ok(vec![Passage::new("ctx")]));

        let mut sink = MockMetricsSink::new();
        sink.expect_emit()
            .times(1)
            .returning(|_| Err(DomainError::storage("disk full")));
        sink.expect_sink_name().return_const("mock");

        let pipeline = RagPipeline::new(
            RagConfig::default(),
            Arc::new(retriever),
            Arc::new(MockRelevanceClassifier::new()),
            Arc::new(MockAnswerGenerator::answering(["ok"])),
            Arc::new(MockAnswerScorer::scoring([4])),
            Arc::new(sink),
        )
        .unwrap();

        let result = pipeline.run("question", None).await;

        assert!(result.success);
        assert_eq!(result.answer, "ok");
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_retriever_times_out() {
        #[derive(Debug)]
        struct SlowRetriever;

        #[async_trait]
        impl Retriever for SlowRetriever {
            async fn retrieve(&self, _question: &str) -> Result<Vec<Passage>, DomainError> {
                tokio::time::sleep(Duration::from_secs(600)).await;
                Ok(vec![])
            }

            fn retriever_name(&self) -> &'static str {
                "slow"
            }
        }

        let pipeline = RagPipeline::new(
            RagConfig::default().with_call_timeout_secs(5),
            Arc::new(SlowRetriever),
            Arc::new(MockRelevanceClassifier::new()),
            Arc::new(MockAnswerGenerator::new()),
            Arc::new(MockAnswerScorer::scoring([5])),
            Arc::new(NoopMetricsSink),
        )
        .unwrap();

        let result = pipeline.run("question", None).await;

        assert!(!result.success);
        assert!(result.error_message.unwrap().contains("timed out after 5s"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = RagPipeline::new(
            RagConfig::default().with_max_correction_attempts(0),
            Arc::new(MockRetriever::new()),
            Arc::new(MockRelevanceClassifier::new()),
            Arc::new(MockAnswerGenerator::new()),
            Arc::new(MockAnswerScorer::scoring([])),
            Arc::new(NoopMetricsSink),
        );

        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }
}
