//! Interactive command - a question loop over one pipeline instance

use std::path::PathBuf;

use clap::Args;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{info, warn};

use super::query::{render, RenderOptions};
use crate::infrastructure::rag::RagPipeline;

const BANNER: &str = "Interactive query mode. Type 'exit' or 'quit' to stop.\n\
Commands: 'context' toggles the source context, 'details' toggles result details.\n\n";

#[derive(Args, Debug)]
pub struct InteractiveArgs {
    /// Corpus to search: a .jsonl file, a .txt/.md file or a directory
    #[arg(long)]
    pub corpus: PathBuf,

    /// Start with the source context shown
    #[arg(long)]
    pub context: bool,

    /// Start with result details shown
    #[arg(long)]
    pub details: bool,
}

/// One line typed at the prompt
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Quit,
    ToggleContext,
    ToggleDetails,
    Blank,
    Question(&'a str),
}

impl<'a> Input<'a> {
    fn parse(line: &'a str) -> Self {
        let line = line.trim();

        match line.to_lowercase().as_str() {
            "exit" | "quit" | "q" => Self::Quit,
            "context" => Self::ToggleContext,
            "details" => Self::ToggleDetails,
            "" => Self::Blank,
            _ => Self::Question(line),
        }
    }
}

/// Answer questions read from stdin until `exit` or end of input
pub async fn run(args: InteractiveArgs) -> anyhow::Result<()> {
    let config = super::load_config();
    super::init_console_logging(&config);

    let retriever = crate::load_retriever(&config, &args.corpus)?;
    let state = crate::create_app_state_with_config(&config, retriever)?;

    let options = RenderOptions {
        show_context: args.context,
        show_details: args.details,
    };

    session(
        &state.pipeline,
        BufReader::new(tokio::io::stdin()),
        &mut tokio::io::stdout(),
        options,
    )
    .await?;

    if let Err(e) = state.collector.flush().await {
        warn!("Failed to write metrics: {}", e);
    }

    Ok(())
}

async fn session<R, W>(
    pipeline: &RagPipeline,
    input: R,
    output: &mut W,
    mut options: RenderOptions,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut answered = 0usize;

    output.write_all(BANNER.as_bytes()).await?;

    loop {
        output.write_all(b"Question: ").await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let message = match Input::parse(&line) {
            Input::Quit => break,
            Input::Blank => continue,
            Input::ToggleContext => {
                options.show_context = !options.show_context;
                format!("Context display: {}\n\n", on_off(options.show_context))
            }
            Input::ToggleDetails => {
                options.show_details = !options.show_details;
                format!("Details display: {}\n\n", on_off(options.show_details))
            }
            Input::Question(question) => {
                let result = pipeline.run(question, None).await;
                answered += 1;
                format!("\n{}\n", render(&result, options))
            }
        };

        output.write_all(message.as_bytes()).await?;
    }

    output.write_all(b"\nGoodbye!\n").await?;
    output.flush().await?;
    info!(questions = answered, "Interactive session ended");

    Ok(())
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "ON" } else { "OFF" }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::rag::mock::{MockAnswerGenerator, MockAnswerScorer, MockRelevanceClassifier};
    use crate::domain::retrieval::{MockRetriever, Passage};
    use crate::domain::RagConfig;
    use crate::infrastructure::metrics::MetricsCollector;

    fn pipeline(questions: usize, collector: Arc<MetricsCollector>) -> RagPipeline {
        let mut retriever = MockRetriever::new();
        retriever
            .expect_retrieve()
            .times(questions)
            .returning(|_| Ok(vec![Passage::new("Rust is a systems language.")]));

        RagPipeline::new(
            RagConfig::default(),
            Arc::new(retriever),
            Arc::new(MockRelevanceClassifier::new()),
            Arc::new(MockAnswerGenerator::answering([
                "A systems language.",
                "Still a systems language.",
            ])),
            Arc::new(MockAnswerScorer::scoring([5, 5])),
            collector,
        )
        .unwrap()
    }

    async fn transcript(pipeline: &RagPipeline, input: &str) -> String {
        let mut output = Vec::new();

        session(pipeline, input.as_bytes(), &mut output, RenderOptions::default())
            .await
            .unwrap();

        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_parse_input() {
        assert_eq!(Input::parse("  QUIT "), Input::Quit);
        assert_eq!(Input::parse("q"), Input::Quit);
        assert_eq!(Input::parse("Context"), Input::ToggleContext);
        assert_eq!(Input::parse("details"), Input::ToggleDetails);
        assert_eq!(Input::parse("   "), Input::Blank);
        assert_eq!(Input::parse(" What is Rust? "), Input::Question("What is Rust?"));
    }

    #[tokio::test]
    async fn test_answers_until_quit() {
        let collector = Arc::new(MetricsCollector::in_memory());
        let pipeline = pipeline(2, collector.clone());

        let text = transcript(
            &pipeline,
            "What is Rust?\n\nIs it fast?\nquit\nNever asked?\n",
        )
        .await;

        assert!(text.contains("Question: What is Rust?"));
        assert!(text.contains("Answer:\nA systems language."));
        assert!(text.contains("Answer:\nStill a systems language."));
        assert!(!text.contains("Never asked?"));
        assert!(text.ends_with("Goodbye!\n"));
        assert_eq!(collector.len(), 2);
    }

    #[tokio::test]
    async fn test_toggles_apply_to_later_answers() {
        let collector = Arc::new(MetricsCollector::in_memory());
        let pipeline = pipeline(1, collector);

        let text = transcript(&pipeline, "details\ncontext\nWhat is Rust?\n").await;

        assert!(text.contains("Details display: ON"));
        assert!(text.contains("Context display: ON"));
        assert!(text.contains("Documents retrieved: 1"));
        assert!(text.contains("Source context:\nRust is a systems language."));
    }

    #[tokio::test]
    async fn test_end_of_input_ends_session() {
        let collector = Arc::new(MetricsCollector::in_memory());
        let pipeline = pipeline(0, collector.clone());

        let text = transcript(&pipeline, "").await;

        assert!(text.starts_with("Interactive query mode."));
        assert!(text.ends_with("Goodbye!\n"));
        assert!(collector.is_empty());
    }
}
