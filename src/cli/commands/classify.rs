//! Classify command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::model::{AgentInvoker, CompletionInvoker, ModelInvoker};
use crate::orchestrator::Orchestrator;
use crate::question::load_questions;
use anyhow::Result;
use std::sync::Arc;

/// Run the classify command.
#[allow(clippy::too_many_arguments)]
pub async fn run_classify(
    input: &str,
    output: Option<String>,
    direct: bool,
    batch_size: Option<usize>,
    model: Option<String>,
    limit: Option<usize>,
    mut settings: Settings,
) -> Result<()> {
    if let Some(batch_size) = batch_size {
        settings.batch.batch_size = batch_size;
    }
    if model.is_some() {
        settings.model.model = model;
    }

    let output = match output {
        Some(path) => std::path::PathBuf::from(path),
        None => settings.result_dir().join("answers.jsonl"),
    };

    // Peek at the input before connecting, so a bad path fails fast
    let mut questions = load_questions(input)?;
    if let Some(limit) = limit {
        questions.truncate(limit);
    }
    if questions.is_empty() {
        Output::warning(&format!("No questions found in {}", input));
        return Ok(());
    }
    Output::info(&format!("Loaded {} questions from {}", questions.len(), input));

    let spinner = Output::spinner("Connecting to model server...");
    let invoker: Arc<dyn ModelInvoker> = if direct {
        Arc::new(CompletionInvoker::connect(&settings).await?)
    } else {
        Arc::new(AgentInvoker::connect(&settings).await?)
    };
    spinner.finish_and_clear();

    let mode = invoker.mode();
    Output::info(&format!(
        "Answering in {} mode, batch size {}",
        mode, settings.batch.batch_size
    ));

    let orchestrator = Orchestrator::new(settings, invoker);
    let mut sink = crate::sink::JsonlSink::create(&output)?;
    let records = orchestrator.run(questions, &mut sink).await?;

    let failed = records.iter().filter(|r| r.invocation_failed).count();
    let unanswered = records
        .iter()
        .filter(|r| r.answer_letter == "X" && !r.invocation_failed)
        .count();

    Output::success(&format!("Results saved to {}", output.display()));
    Output::kv("answered", &(records.len() - failed - unanswered).to_string());
    Output::kv("unanswered", &unanswered.to_string());
    Output::kv("failed", &failed.to_string());

    Ok(())
}
