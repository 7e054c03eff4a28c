//! CLI module for Svar.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Svar - Biology MCQ Answering
///
/// A CLI pipeline for answering biology multiple-choice questions with a
/// locally hosted language model. The name "Svar" comes from the
/// Norwegian/Scandinavian word for "answer."
#[derive(Parser, Debug)]
#[command(name = "svar")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a question file and write results as JSON-Lines
    Classify {
        /// Input question file (JSON array or JSON-Lines)
        input: String,

        /// Output file (default: <result_dir>/answers.jsonl)
        #[arg(short, long)]
        output: Option<String>,

        /// Answer by direct completion instead of the tool-using agent
        #[arg(long)]
        direct: bool,

        /// Questions per batch
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Model name (default: auto-detect from the server)
        #[arg(short, long)]
        model: Option<String>,

        /// Only process the first N questions
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Query the cancer genomics tool directly
    Lookup {
        /// Comma-separated gene symbols (e.g. "TP53,PIK3CA,EGFR")
        genes: String,

        /// Cancer type keyword (e.g. "Breast", "Lung Adenocarcinoma")
        cancer: String,

        /// Only show protein (RPPA) expression fields
        #[arg(long)]
        protein_only: bool,
    },

    /// Search bioRxiv preprints directly
    Biorxiv {
        /// Search query
        query: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Write the default configuration file
    Init,

    /// Show configuration file path
    Path,
}
