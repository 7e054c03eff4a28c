//! Svar CLI entry point.

use anyhow::Result;
use clap::Parser;
use svar::cli::{commands, Cli, Commands};
use svar::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("svar={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&std::path::PathBuf::from(path)))?,
        None => Settings::load()?,
    };

    // Execute command
    match &cli.command {
        Commands::Classify {
            input,
            output,
            direct,
            batch_size,
            model,
            limit,
        } => {
            commands::run_classify(
                input,
                output.clone(),
                *direct,
                *batch_size,
                model.clone(),
                *limit,
                settings,
            )
            .await?;
        }

        Commands::Lookup {
            genes,
            cancer,
            protein_only,
        } => {
            commands::run_lookup(genes, cancer, *protein_only, settings).await?;
        }

        Commands::Biorxiv { query } => {
            commands::run_biorxiv(query, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings)?;
        }
    }

    Ok(())
}
