//! Biorxiv command implementation.

use crate::biorxiv::BiorxivSearch;
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Run the biorxiv command: search preprints directly.
pub async fn run_biorxiv(query: &str, settings: Settings) -> Result<()> {
    let search = BiorxivSearch::new(settings.tools.request_timeout_seconds)?;

    let spinner = Output::spinner(&format!("Searching bioRxiv for '{}'...", query));
    let results = search.search(query).await;
    spinner.finish_and_clear();

    println!("{}", results);
    Ok(())
}
