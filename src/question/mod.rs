//! Question records, loading, and batching.
//!
//! Input records carry arbitrary extra fields (dataset IDs, provenance,
//! split labels) which must survive untouched into the output, so the
//! typed fields are paired with a flattened passthrough map.

use crate::error::{Result, SvarError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::debug;

/// Letter set assumed when a question arrives without usable options.
pub const FALLBACK_LETTERS: [char; 5] = ['A', 'B', 'C', 'D', 'E'];

/// A multiple-choice question.
///
/// `options` is kept in its raw form (object or JSON-encoded string) so
/// that serializing a result record reproduces the input exactly; use
/// [`Question::decoded_options`] for the parsed view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,

    pub question: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Question {
    /// Decode the options field into ordered (letter, text) pairs.
    ///
    /// Accepts a JSON object or a JSON-encoded object string. Anything else,
    /// including a string that fails to parse, degrades to an empty list.
    pub fn decoded_options(&self) -> Vec<(String, String)> {
        let map = match &self.options {
            None => return Vec::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
                Ok(Value::Object(map)) => map,
                _ => {
                    debug!("Unparseable options field on question {}", self.id_label());
                    return Vec::new();
                }
            },
            Some(_) => {
                debug!("Unsupported options shape on question {}", self.id_label());
                return Vec::new();
            }
        };

        map.into_iter()
            .map(|(key, value)| {
                let text = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                (key, text)
            })
            .collect()
    }

    /// The valid answer letters for this question, in option order.
    ///
    /// Only single-letter option keys qualify; an empty result means the
    /// question arrived without a usable option set.
    pub fn valid_letters(&self) -> Vec<char> {
        self.decoded_options()
            .iter()
            .filter_map(|(key, _)| {
                let trimmed = key.trim();
                let mut chars = trimmed.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_ascii_alphabetic() => Some(c.to_ascii_uppercase()),
                    _ => None,
                }
            })
            .collect()
    }

    /// A display label for log lines, mirroring the record's `id` field.
    pub fn id_label(&self) -> String {
        match &self.id {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "unknown".to_string(),
        }
    }
}

/// Load questions from a JSON or JSON-Lines file, chosen by extension.
pub fn load_questions(path: impl AsRef<Path>) -> Result<Vec<Question>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        SvarError::QuestionFile(format!("Cannot read {}: {}", path.display(), e))
    })?;

    let questions = if path.extension().is_some_and(|ext| ext == "jsonl") {
        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str::<Question>(line).map_err(|e| {
                    SvarError::QuestionFile(format!(
                        "{}:{}: invalid question record: {}",
                        path.display(),
                        n + 1,
                        e
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?
    } else {
        serde_json::from_str::<Vec<Question>>(&content).map_err(|e| {
            SvarError::QuestionFile(format!("{}: invalid question array: {}", path.display(), e))
        })?
    };

    Ok(questions)
}

/// Split questions into contiguous batches, preserving order.
///
/// The last batch may be smaller; every question lands in exactly one batch.
pub fn make_batches<T>(items: Vec<T>, batch_size: usize) -> Vec<Vec<T>> {
    let batch_size = batch_size.max(1);
    let mut batches = Vec::with_capacity(items.len().div_ceil(batch_size));
    let mut batch = Vec::with_capacity(batch_size);

    for item in items {
        batch.push(item);
        if batch.len() == batch_size {
            batches.push(std::mem::replace(&mut batch, Vec::with_capacity(batch_size)));
        }
    }
    if !batch.is_empty() {
        batches.push(batch);
    }

    batches
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn question_from(json: &str) -> Question {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_options_native_and_serialized_match() {
        let native = question_from(
            r#"{"question": "q", "options": {"A": "mitosis", "B": "meiosis"}}"#,
        );
        let serialized = question_from(
            r#"{"question": "q", "options": "{\"A\": \"mitosis\", \"B\": \"meiosis\"}"}"#,
        );

        assert_eq!(native.decoded_options(), serialized.decoded_options());
        assert_eq!(native.valid_letters(), vec!['A', 'B']);
    }

    #[test]
    fn test_option_order_preserved() {
        let q = question_from(
            r#"{"question": "q", "options": {"C": "third", "A": "first", "B": "second"}}"#,
        );
        let keys: Vec<String> = q.decoded_options().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_malformed_options_degrade_to_empty() {
        let q = question_from(r#"{"question": "q", "options": "{not json"}"#);
        assert!(q.decoded_options().is_empty());
        assert!(q.valid_letters().is_empty());

        let q = question_from(r#"{"question": "q", "options": 42}"#);
        assert!(q.decoded_options().is_empty());
    }

    #[test]
    fn test_extra_fields_roundtrip() {
        let q = question_from(
            r#"{"id": 7, "question": "q", "options": {"A": "x"}, "source": "exam-2024", "difficulty": 3}"#,
        );
        assert_eq!(q.extra.get("source").unwrap(), "exam-2024");

        let back = serde_json::to_value(&q).unwrap();
        assert_eq!(back["source"], "exam-2024");
        assert_eq!(back["difficulty"], 3);
        assert_eq!(back["id"], 7);
    }

    #[test]
    fn test_make_batches_partition() {
        let items: Vec<u32> = (1..=10).collect();
        let batches = make_batches(items, 3);

        let sizes: Vec<usize> = batches.iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![3, 3, 3, 1]);

        let flattened: Vec<u32> = batches.into_iter().flatten().collect();
        assert_eq!(flattened, (1..=10).collect::<Vec<u32>>());
    }

    #[test]
    fn test_make_batches_empty_and_oversized() {
        assert!(make_batches(Vec::<u32>::new(), 3).is_empty());

        let batches = make_batches(vec![1, 2], 10);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0], vec![1, 2]);
    }

    #[test]
    fn test_load_questions_jsonl() {
        let mut file = tempfile::Builder::new().suffix(".jsonl").tempfile().unwrap();
        writeln!(file, r#"{{"id": 1, "question": "first", "options": {{"A": "x"}}}}"#).unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"id": 2, "question": "second", "options": {{"B": "y"}}}}"#).unwrap();

        let questions = load_questions(file.path()).unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].question, "first");
        assert_eq!(questions[1].id_label(), "2");
    }

    #[test]
    fn test_load_questions_json_array() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"[{{"question": "only", "options": {{"A": "x", "B": "y"}}}}]"#
        )
        .unwrap();

        let questions = load_questions(file.path()).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].valid_letters(), vec!['A', 'B']);
    }
}
