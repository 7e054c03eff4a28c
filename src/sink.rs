//! Incremental JSON-Lines result writer.

use crate::error::{Result, SvarError};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only JSON-Lines sink, flushed per record.
///
/// Single-writer by construction: the orchestrator owns it and appends
/// sequentially, so a crash mid-run leaves every prior record durable and
/// the file valid line-by-line.
pub struct JsonlSink {
    path: PathBuf,
    file: File,
}

impl JsonlSink {
    /// Create (or truncate) the sink file, creating parent directories.
    ///
    /// Failure here is fatal to a run: without a sink no result can be
    /// durably recorded.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    SvarError::Sink(format!("Cannot create {}: {}", parent.display(), e))
                })?;
            }
        }

        let file = File::create(&path)
            .map_err(|e| SvarError::Sink(format!("Cannot open {}: {}", path.display(), e)))?;

        Ok(Self { path, file })
    }

    /// Append one record as a JSON line and flush it to disk.
    pub fn append<T: Serialize>(&mut self, record: &T) -> Result<()> {
        let line = serde_json::to_string(record)?;
        self.file
            .write_all(line.as_bytes())
            .and_then(|_| self.file.write_all(b"\n"))
            .and_then(|_| self.file.flush())
            .map_err(|e| SvarError::Sink(format!("Write to {} failed: {}", self.path.display(), e)))
    }

    /// Path of the sink file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_append_writes_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("answers.jsonl");

        let mut sink = JsonlSink::create(&path).unwrap();
        sink.append(&json!({"id": 1, "answer_letter": "A"})).unwrap();
        sink.append(&json!({"id": 2, "answer_letter": "X"})).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["answer_letter"], "X");
    }

    #[test]
    fn test_create_makes_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/answers.jsonl");

        let sink = JsonlSink::create(&path).unwrap();
        assert_eq!(sink.path(), path);
        assert!(path.parent().unwrap().exists());
    }

    #[test]
    fn test_create_fails_on_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be
        let path = dir.path().join("answers.jsonl");
        std::fs::create_dir(&path).unwrap();

        assert!(matches!(
            JsonlSink::create(&path),
            Err(SvarError::Sink(_))
        ));
    }
}
