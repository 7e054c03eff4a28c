//! Prompt construction for agent and direct-completion modes.
//!
//! The chat-template rendering a direct-completion prompt needs is a
//! model-specific artifact, so the builder takes it as an injected
//! [`ChatTemplate`] capability instead of owning template logic.

use crate::error::Result;
use crate::question::{Question, FALLBACK_LETTERS};
use std::sync::Arc;
use tracing::warn;

/// How a prompt will be consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptMode {
    /// Plain instructional text for the tool-using agent.
    #[default]
    Agent,
    /// Chat-template rendering for the raw completions endpoint.
    Direct,
}

impl std::str::FromStr for PromptMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "agent" => Ok(PromptMode::Agent),
            "direct" | "completion" => Ok(PromptMode::Direct),
            _ => Err(format!("Unknown prompt mode: {}", s)),
        }
    }
}

impl std::fmt::Display for PromptMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PromptMode::Agent => write!(f, "agent"),
            PromptMode::Direct => write!(f, "direct"),
        }
    }
}

/// Message roles in a chat exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single chat message.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Renders a message list into the string a completions endpoint expects.
pub trait ChatTemplate: Send + Sync {
    fn render(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// ChatML rendering, the template Qwen-family local servers expect.
pub struct ChatMlTemplate;

impl ChatTemplate for ChatMlTemplate {
    fn render(&self, messages: &[ChatMessage]) -> Result<String> {
        let mut out = String::new();
        for message in messages {
            out.push_str("<|im_start|>");
            out.push_str(message.role.as_str());
            out.push('\n');
            out.push_str(&message.content);
            out.push_str("<|im_end|>\n");
        }
        // Generation prompt: the model continues as the assistant.
        out.push_str("<|im_start|>assistant\n");
        Ok(out)
    }
}

/// Builds prompts from question records.
pub struct PromptBuilder {
    template: Arc<dyn ChatTemplate>,
}

impl PromptBuilder {
    /// Create a builder with the given chat-template capability.
    pub fn new(template: Arc<dyn ChatTemplate>) -> Self {
        Self { template }
    }

    /// Build a prompt string for one question in the given mode.
    pub fn build(&self, question: &Question, mode: PromptMode) -> Result<String> {
        let options = question.decoded_options();

        let mut options_text = String::new();
        for (letter, text) in &options {
            options_text.push_str(letter);
            options_text.push_str(": ");
            options_text.push_str(text);
            options_text.push('\n');
        }

        match mode {
            PromptMode::Agent => Ok(format!(
                "Question: {}\n\nOptions:\n{}\n\
                 INSTRUCTIONS: If this question involves cancer/genes/proteins, \
                 USE TOOLS IMMEDIATELY. Answer with <answer>[letter]</answer>",
                question.question, options_text
            )),
            PromptMode::Direct => {
                let letters: Vec<&str> = options.iter().map(|(k, _)| k.as_str()).collect();
                let letter_list = letters.join(", ");

                let messages = [
                    ChatMessage::system(format!(
                        "You are a biology expert. Answer the following multiple choice \
                         questions by selecting the correct option ({}) and providing a \
                         brief explanation. Always format your answer as \
                         <answer>[letter]</answer>.",
                        letter_list
                    )),
                    ChatMessage::user(format!(
                        "Question: {}\n\nOptions:\n{}\n\
                         Please provide your answer as a single letter ({}).\n\
                         Format your answer as: <answer>[letter]</answer>\n\nAnswer:",
                        question.question, options_text, letter_list
                    )),
                ];

                self.template.render(&messages)
            }
        }
    }

    /// Build prompts for a whole batch, stopping on the first failure.
    pub fn build_batch(&self, questions: &[Question], mode: PromptMode) -> Result<Vec<String>> {
        questions.iter().map(|q| self.build(q, mode)).collect()
    }
}

/// The letter alphabet answer extraction should accept for a question.
///
/// Agent mode assumes A-E when the option set is unusable; that widening can
/// accept a letter outside the question's true option set, so taking it is
/// logged. Direct mode keeps the empty set.
pub fn effective_letters(question: &Question, mode: PromptMode) -> Vec<char> {
    let letters = question.valid_letters();
    if letters.is_empty() && mode == PromptMode::Agent {
        warn!(
            "Question {} has no usable options; falling back to A-E",
            question.id_label()
        );
        return FALLBACK_LETTERS.to_vec();
    }
    letters
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(json: &str) -> Question {
        serde_json::from_str(json).unwrap()
    }

    fn builder() -> PromptBuilder {
        PromptBuilder::new(Arc::new(ChatMlTemplate))
    }

    #[test]
    fn test_agent_prompt_format() {
        let q = question(r#"{"question": "Which phase?", "options": {"A": "G1", "B": "S"}}"#);
        let prompt = builder().build(&q, PromptMode::Agent).unwrap();

        assert!(prompt.starts_with("Question: Which phase?\n\nOptions:\nA: G1\nB: S\n"));
        assert!(prompt.contains("USE TOOLS IMMEDIATELY"));
        assert!(prompt.ends_with("<answer>[letter]</answer>"));
    }

    #[test]
    fn test_direct_prompt_renders_chatml() {
        let q = question(r#"{"question": "Which phase?", "options": {"A": "G1", "B": "S"}}"#);
        let prompt = builder().build(&q, PromptMode::Direct).unwrap();

        assert!(prompt.starts_with("<|im_start|>system\nYou are a biology expert."));
        assert!(prompt.contains("correct option (A, B)"));
        assert!(prompt.contains("<|im_start|>user\nQuestion: Which phase?"));
        assert!(prompt.ends_with("<|im_start|>assistant\n"));
    }

    #[test]
    fn test_native_and_serialized_options_build_identical_prompts() {
        let native = question(r#"{"question": "q", "options": {"A": "left", "B": "right"}}"#);
        let serialized =
            question(r#"{"question": "q", "options": "{\"A\": \"left\", \"B\": \"right\"}"}"#);

        let b = builder();
        for mode in [PromptMode::Agent, PromptMode::Direct] {
            assert_eq!(
                b.build(&native, mode).unwrap(),
                b.build(&serialized, mode).unwrap()
            );
        }
    }

    #[test]
    fn test_empty_options_render_degraded() {
        let q = question(r#"{"question": "q", "options": "not-json"}"#);
        let b = builder();

        let agent = b.build(&q, PromptMode::Agent).unwrap();
        assert!(agent.contains("Options:\n\n"));

        let direct = b.build(&q, PromptMode::Direct).unwrap();
        assert!(direct.contains("correct option ()"));
    }

    #[test]
    fn test_effective_letters_fallback() {
        let q = question(r#"{"question": "q"}"#);
        assert_eq!(
            effective_letters(&q, PromptMode::Agent),
            vec!['A', 'B', 'C', 'D', 'E']
        );
        assert!(effective_letters(&q, PromptMode::Direct).is_empty());

        let q = question(r#"{"question": "q", "options": {"A": "x", "B": "y"}}"#);
        assert_eq!(effective_letters(&q, PromptMode::Agent), vec!['A', 'B']);
    }
}
