//! Batch pipeline orchestrator.
//!
//! Coordinates loading, prompt building, concurrent model dispatch, answer
//! extraction and incremental persistence. Batches run strictly in order; a
//! batch's results are all resolved and written before the next one starts.

use crate::config::Settings;
use crate::error::Result;
use crate::extract::{extract_answer, UNANSWERED};
use crate::model::{ModelInvoker, ModelResponse};
use crate::prompt::{effective_letters, ChatMlTemplate, PromptBuilder};
use crate::question::{load_questions, make_batches, Question};
use crate::sink::JsonlSink;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// One answered (or failed) question, as written to the output file.
///
/// Carries every input field untouched plus the model's raw response and the
/// extracted answer letter. Written once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRecord {
    #[serde(flatten)]
    pub question: Question,
    pub raw_response: String,
    pub answer_letter: String,
    /// Whether this record came from a failed invocation. Not persisted.
    #[serde(skip)]
    pub invocation_failed: bool,
}

impl ResultRecord {
    fn answered(question: Question, raw_response: String, answer_letter: char) -> Self {
        Self {
            question,
            raw_response,
            answer_letter: answer_letter.to_string(),
            invocation_failed: false,
        }
    }

    fn failed(question: Question, error_text: &str) -> Self {
        Self {
            question,
            raw_response: format!("Error: {}", error_text),
            answer_letter: UNANSWERED.to_string(),
            invocation_failed: true,
        }
    }
}

/// Counts for a completed run.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Questions processed (always equals the input count).
    pub total: usize,
    /// Invocations that returned a response.
    pub succeeded: usize,
    /// Invocations that failed (timeout or error).
    pub failed: usize,
    /// Records whose answer letter is the unanswered sentinel.
    pub unanswered: usize,
}

/// The main orchestrator for the answering pipeline.
pub struct Orchestrator {
    settings: Settings,
    prompt_builder: PromptBuilder,
    invoker: Arc<dyn ModelInvoker>,
}

impl Orchestrator {
    /// Create an orchestrator with the default ChatML template.
    pub fn new(settings: Settings, invoker: Arc<dyn ModelInvoker>) -> Self {
        Self::with_components(settings, PromptBuilder::new(Arc::new(ChatMlTemplate)), invoker)
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompt_builder: PromptBuilder,
        invoker: Arc<dyn ModelInvoker>,
    ) -> Self {
        Self {
            settings,
            prompt_builder,
            invoker,
        }
    }

    /// Load a question file, answer everything, and stream results to
    /// `output`.
    #[instrument(skip(self, input, output), fields(input = %input.as_ref().display()))]
    pub async fn classify_file(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> Result<RunSummary> {
        let questions = load_questions(&input)?;
        info!(
            "Loaded {} questions from {}",
            questions.len(),
            input.as_ref().display()
        );

        // No sink, no run: results must be durable from the first record.
        let mut sink = JsonlSink::create(&output)?;

        let records = self.run(questions, &mut sink).await?;

        let failed = records.iter().filter(|r| r.invocation_failed).count();
        let summary = RunSummary {
            total: records.len(),
            succeeded: records.len() - failed,
            failed,
            unanswered: records
                .iter()
                .filter(|r| r.answer_letter == UNANSWERED.to_string())
                .count(),
        };

        info!(
            "Results saved to {} ({} total, {} succeeded, {} failed)",
            sink.path().display(),
            summary.total,
            summary.succeeded,
            summary.failed
        );

        Ok(summary)
    }

    /// Answer a question list, appending each record to the sink as soon as
    /// it is resolved. Returns every record in input order.
    pub async fn run(
        &self,
        questions: Vec<Question>,
        sink: &mut JsonlSink,
    ) -> Result<Vec<ResultRecord>> {
        if questions.is_empty() {
            return Ok(Vec::new());
        }

        let mode = self.invoker.mode();
        let batches = make_batches(questions, self.settings.batch.batch_size);
        let batch_count = batches.len();
        let total: usize = batches.iter().map(|b| b.len()).sum();

        info!(
            "Processing {} questions in {} batches (mode: {}, batch size: {})",
            total, batch_count, mode, self.settings.batch.batch_size
        );

        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.green} Answering [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("█▓░"),
        );

        let mut all_records = Vec::with_capacity(total);

        for (batch_idx, batch) in batches.into_iter().enumerate() {
            let mut success_count = 0usize;
            let mut error_count = 0usize;

            match self.dispatch_batch(&batch).await {
                Ok(outcomes) => {
                    // Re-pair outcomes with questions by index
                    for (question, outcome) in batch.into_iter().zip(outcomes) {
                        let record = match outcome {
                            Ok(response) => {
                                success_count += 1;
                                let text = response.final_text().to_string();
                                let letters = effective_letters(&question, mode);
                                let options = question.decoded_options();
                                let letter = extract_answer(&text, &letters, &options);
                                ResultRecord::answered(question, text, letter)
                            }
                            Err(e) => {
                                error_count += 1;
                                warn!(
                                    "Error processing question {}: {}",
                                    question.id_label(),
                                    e
                                );
                                ResultRecord::failed(question, &e.to_string())
                            }
                        };

                        sink.append(&record)?;
                        pb.inc(1);
                        all_records.push(record);
                    }
                }
                Err(e) => {
                    // Shared-step failure: every question in the batch gets
                    // the same fallback record.
                    error!("Batch {}/{} failed: {}", batch_idx + 1, batch_count, e);
                    let error_text = e.to_string();
                    error_count = batch.len();
                    for question in batch {
                        let record = ResultRecord::failed(question, &error_text);
                        sink.append(&record)?;
                        pb.inc(1);
                        all_records.push(record);
                    }
                }
            }

            info!(
                "Batch {}/{}: {} succeeded, {} failed",
                batch_idx + 1,
                batch_count,
                success_count,
                error_count
            );
        }

        pb.finish_and_clear();
        Ok(all_records)
    }

    /// Build prompts for a batch and invoke the model for each concurrently.
    ///
    /// An `Err` here means no per-item outcome exists (the shared prompt
    /// build failed); individual invocation failures come back as `Err`
    /// entries inside the vector.
    async fn dispatch_batch(&self, batch: &[Question]) -> Result<Vec<Result<ModelResponse>>> {
        let prompts = self.prompt_builder.build_batch(batch, self.invoker.mode())?;

        let invocations = prompts.iter().map(|prompt| self.invoker.invoke(prompt));
        Ok(futures::future::join_all(invocations).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SvarError;
    use crate::prompt::PromptMode;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted invoker: answers with a fixed letter tag, failing the n-th
    /// invocation (1-based) with a timeout.
    struct ScriptedInvoker {
        calls: AtomicUsize,
        fail_on: Option<usize>,
    }

    impl ScriptedInvoker {
        fn new(fail_on: Option<usize>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_on,
            }
        }
    }

    #[async_trait]
    impl ModelInvoker for ScriptedInvoker {
        fn mode(&self) -> PromptMode {
            PromptMode::Agent
        }

        async fn invoke(&self, _prompt: &str) -> Result<ModelResponse> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_on == Some(call) {
                return Err(SvarError::InvocationTimeout(400));
            }
            Ok(ModelResponse::Completion {
                text: "<answer>B</answer>".to_string(),
            })
        }
    }

    fn questions(n: usize) -> Vec<Question> {
        (1..=n)
            .map(|i| {
                serde_json::from_str(&format!(
                    r#"{{"id": {i}, "question": "q{i}", "options": {{"A": "first", "B": "second"}}}}"#
                ))
                .unwrap()
            })
            .collect()
    }

    fn settings_with_batch_size(batch_size: usize) -> Settings {
        let mut settings = Settings::default();
        settings.batch.batch_size = batch_size;
        settings
    }

    #[tokio::test]
    async fn test_every_question_yields_exactly_one_record() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("answers.jsonl");

        let orchestrator = Orchestrator::new(
            settings_with_batch_size(2),
            Arc::new(ScriptedInvoker::new(None)),
        );
        let mut sink = JsonlSink::create(&output).unwrap();
        let records = orchestrator.run(questions(5), &mut sink).await.unwrap();

        assert_eq!(records.len(), 5);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.question.id_label(), (i + 1).to_string());
            assert_eq!(record.answer_letter, "B");
        }

        let content = std::fs::read_to_string(&output).unwrap();
        assert_eq!(content.lines().count(), 5);
    }

    #[tokio::test]
    async fn test_single_timeout_only_affects_its_question() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("answers.jsonl");

        // 5 questions, batch size 2, invocation 3 times out
        let orchestrator = Orchestrator::new(
            settings_with_batch_size(2),
            Arc::new(ScriptedInvoker::new(Some(3))),
        );
        let mut sink = JsonlSink::create(&output).unwrap();
        let summary_records = orchestrator.run(questions(5), &mut sink).await.unwrap();

        let content = std::fs::read_to_string(&output).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 5);

        for (i, line) in lines.iter().enumerate() {
            if i == 2 {
                assert_eq!(line["answer_letter"], "X");
                assert!(line["raw_response"]
                    .as_str()
                    .unwrap()
                    .starts_with("Error: "));
            } else {
                assert_eq!(line["answer_letter"], "B");
            }
        }

        assert_eq!(summary_records.len(), 5);
    }

    #[tokio::test]
    async fn test_classify_file_summary_counts() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("questions.jsonl");
        let output = dir.path().join("answers.jsonl");

        let lines: Vec<String> = (1..=4)
            .map(|i| {
                format!(
                    r#"{{"id": {i}, "question": "q{i}", "options": {{"A": "first", "B": "second"}}}}"#
                )
            })
            .collect();
        std::fs::write(&input, lines.join("\n")).unwrap();

        let orchestrator = Orchestrator::new(
            settings_with_batch_size(3),
            Arc::new(ScriptedInvoker::new(Some(2))),
        );
        let summary = orchestrator.classify_file(&input, &output).await.unwrap();

        assert_eq!(summary.total, 4);
        assert_eq!(summary.succeeded, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.unanswered, 1);
    }

    #[tokio::test]
    async fn test_extra_fields_survive_into_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("questions.jsonl");
        let output = dir.path().join("answers.jsonl");

        std::fs::write(
            &input,
            r#"{"id": 1, "question": "q", "options": {"A": "x", "B": "y"}, "source": "exam-2024"}"#,
        )
        .unwrap();

        let orchestrator = Orchestrator::new(
            settings_with_batch_size(8),
            Arc::new(ScriptedInvoker::new(None)),
        );
        orchestrator.classify_file(&input, &output).await.unwrap();

        let line: serde_json::Value =
            serde_json::from_str(std::fs::read_to_string(&output).unwrap().trim()).unwrap();
        assert_eq!(line["source"], "exam-2024");
        assert_eq!(line["question"], "q");
        assert_eq!(line["answer_letter"], "B");
        assert_eq!(line["raw_response"], "<answer>B</answer>");
    }
}
