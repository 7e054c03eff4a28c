//! Svar - Biology Multiple-Choice Question Answering
//!
//! A CLI pipeline for answering biology multiple-choice questions with a
//! locally hosted, OpenAI-compatible language model.
//!
//! The name "Svar" comes from the Norwegian/Scandinavian word for "answer."
//!
//! # Overview
//!
//! Svar allows you to:
//! - Load question sets from JSON or JSON-Lines files
//! - Answer them with a local model, either by direct completion or through
//!   an agent that can query cancer genomics and preprint-search tools
//! - Extract a committed answer letter from free-text model output
//! - Stream results to a crash-safe JSON-Lines file, one record per question
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `question` - Question records, loading, and batching
//! - `prompt` - Prompt construction for agent and direct-completion modes
//! - `extract` - Answer-letter extraction from model responses
//! - `model` - Model-invocation capability (completion and agent backed)
//! - `agent` - Tool-calling agent loop
//! - `genomics` - cBioPortal cancer genomics client and feature aggregation
//! - `biorxiv` - bioRxiv preprint search
//! - `sink` - Incremental JSON-Lines result writer
//! - `orchestrator` - Batch pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use svar::config::Settings;
//! use svar::model::CompletionInvoker;
//! use svar::orchestrator::Orchestrator;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let invoker = Arc::new(CompletionInvoker::connect(&settings).await?);
//!     let orchestrator = Orchestrator::new(settings, invoker);
//!
//!     let summary = orchestrator
//!         .classify_file("data/questions.jsonl", "result/answers.jsonl")
//!         .await?;
//!     println!("Answered {} questions", summary.total);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod biorxiv;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod genomics;
pub mod model;
pub mod openai;
pub mod orchestrator;
pub mod prompt;
pub mod question;
pub mod sink;

pub use error::{Result, SvarError};
