//! Lookup command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::genomics::{build_gene_report, protein_only_report, CbioPortalClient};
use anyhow::Result;

/// Run the lookup command: query the genomics tool directly.
pub async fn run_lookup(
    genes: &str,
    cancer: &str,
    protein_only: bool,
    settings: Settings,
) -> Result<()> {
    let client = CbioPortalClient::new(
        &settings.tools.cbioportal_base_url,
        settings.tools.request_timeout_seconds,
    )?;

    let spinner = Output::spinner(&format!("Querying cBioPortal for {} in {}...", genes, cancer));
    let report = build_gene_report(&client, genes, cancer, settings.tools.max_studies).await;
    spinner.finish_and_clear();

    if protein_only {
        println!("{}", protein_only_report(&report));
    } else {
        println!("{}", report);
    }

    Ok(())
}
