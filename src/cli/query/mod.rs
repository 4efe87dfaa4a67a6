//! Query command - answers one question against a local corpus

use std::fmt::{self, Write};
use std::path::PathBuf;

use clap::Args;
use tracing::warn;

use crate::domain::PipelineResult;

/// Longest source context shown before it is cut with `...`
const CONTEXT_PREVIEW_CHARS: usize = 500;

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Corpus to search: a .jsonl file, a .txt/.md file or a directory
    #[arg(long)]
    pub corpus: PathBuf,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    /// Show the source context the answer was generated from
    #[arg(long)]
    pub context: bool,

    /// Show document counts and correction attempts
    #[arg(long)]
    pub details: bool,

    /// Question to answer
    pub question: String,
}

/// Optional sections of the text rendering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    pub show_context: bool,
    pub show_details: bool,
}

/// Run the pipeline once and print its result to stdout
pub async fn run(args: QueryArgs) -> anyhow::Result<()> {
    let config = super::load_config();
    super::init_console_logging(&config);

    let retriever = crate::load_retriever(&config, &args.corpus)?;
    let state = crate::create_app_state_with_config(&config, retriever)?;

    let result = state.pipeline.run(&args.question, None).await;
    if let Err(e) = state.collector.flush().await {
        warn!("Failed to write metrics: {}", e);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        let options = RenderOptions {
            show_context: args.context,
            show_details: args.details,
        };
        println!("{}", render(&result, options));
    }

    Ok(())
}

/// Human-readable rendering shared by `query` and `interactive`
pub(crate) fn render(result: &PipelineResult, options: RenderOptions) -> String {
    let mut out = String::new();
    // fmt::Write for String never fails
    let _ = write_result(&mut out, result, options);
    out
}

fn write_result(out: &mut String, result: &PipelineResult, options: RenderOptions) -> fmt::Result {
    writeln!(out, "Question: {}\n", result.question)?;
    writeln!(out, "Answer:\n{}\n", result.answer)?;
    writeln!(out, "Score: {}/5 ({})", result.score, result.score_justification)?;

    if options.show_details {
        writeln!(out, "\nDetails:")?;
        writeln!(out, "  Documents retrieved: {}", result.documents_retrieved)?;
        writeln!(out, "  Documents after filter: {}", result.documents_after_filter)?;
        writeln!(out, "  Correction attempts: {}", result.correction_attempts)?;
        writeln!(out, "  Success: {}", result.success)?;
    }

    if options.show_context {
        writeln!(out, "\nSource context:")?;
        writeln!(out, "{}", context_preview(&result.source_context))?;
    }

    if let Some(error) = &result.error_message {
        writeln!(out, "Error: {}", error)?;
    }

    Ok(())
}

fn context_preview(context: &str) -> String {
    if context.chars().count() <= CONTEXT_PREVIEW_CHARS {
        return context.to_string();
    }

    let mut preview: String = context.chars().take(CONTEXT_PREVIEW_CHARS).collect();
    preview.push_str("...");
    preview
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answered(context: &str) -> PipelineResult {
        PipelineResult {
            question: "What is Rust?".to_string(),
            answer: "A systems language.".to_string(),
            score: 5,
            score_justification: "Fully supported".to_string(),
            source_context: context.to_string(),
            documents_retrieved: 4,
            documents_after_filter: 2,
            correction_attempts: 1,
            success: true,
            error_message: None,
        }
    }

    #[test]
    fn test_render_failure_includes_error() {
        let result = PipelineResult::no_documents("Why?");

        let text = render(&result, RenderOptions::default());

        assert!(text.contains("Question: Why?"));
        assert!(text.contains("Score: 0/5"));
        assert!(text.contains("Error: No documents retrieved"));
    }

    #[test]
    fn test_render_hides_optional_sections_by_default() {
        let text = render(&answered("Rust is a systems language."), RenderOptions::default());

        assert!(text.contains("Answer:\nA systems language."));
        assert!(text.contains("Score: 5/5 (Fully supported)"));
        assert!(!text.contains("Details:"));
        assert!(!text.contains("Source context:"));
    }

    #[test]
    fn test_render_details() {
        let options = RenderOptions {
            show_details: true,
            ..Default::default()
        };

        let text = render(&answered("ctx"), options);

        assert!(text.contains("Documents retrieved: 4"));
        assert!(text.contains("Documents after filter: 2"));
        assert!(text.contains("Correction attempts: 1"));
        assert!(text.contains("Success: true"));
        assert!(!text.contains("Source context:"));
    }

    #[test]
    fn test_render_context_is_cut_to_preview() {
        let options = RenderOptions {
            show_context: true,
            ..Default::default()
        };
        let long = "é".repeat(CONTEXT_PREVIEW_CHARS + 20);

        let short_text = render(&answered("Rust is a systems language."), options);
        let long_text = render(&answered(&long), options);

        assert!(short_text.contains("Source context:\nRust is a systems language.\n"));
        let expected = format!("{}...", "é".repeat(CONTEXT_PREVIEW_CHARS));
        assert!(long_text.contains(&expected));
        assert!(!long_text.contains(&long));
    }
}
