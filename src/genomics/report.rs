//! Combined per-gene genomics report for the agent.
//!
//! Aggregates mutation, expression, CNA and clinical data across all
//! matching studies and serializes one JSON document the model can read.
//! Failures are rendered as `{"error": ...}` JSON so the agent loop always
//! receives a well-formed tool result.

use super::clinical::clinical_features;
use super::client::{gene_symbol_map, CbioPortalClient, ClinicalData, MolecularData, Mutation};
use super::copy_number::cna_features;
use super::expression::{expression_features, fold_changes};
use super::mutations::mutation_features;
use crate::error::Result;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Aggregated genomics features for one gene.
#[derive(Debug, Clone, Serialize)]
pub struct GeneReport {
    // Mutation data
    pub mutation_frequency: f64,
    pub mutation_profile: String,
    pub hotspot_mutations: String,
    pub truncating_pct: f64,
    // mRNA expression data
    pub mrna_expression_profile: String,
    pub mrna_z_score: String,
    pub mrna_normal_profile: String,
    pub mrna_fold_change: String,
    // Protein expression data (RPPA z-scores)
    pub protein_expression_profile: String,
    // Copy number alteration data
    pub cna_profile: String,
    pub cna_breakdown: String,
    pub amplification_pct: f64,
    pub deletion_pct: f64,
    // Sample info
    pub sample_count: usize,
    pub study_count: usize,
}

/// Query cBioPortal and build the combined gene report as a JSON string.
///
/// Never fails: every error path produces an `{"error": ...}` document.
pub async fn build_gene_report(
    client: &CbioPortalClient,
    genes: &str,
    cancer_name: &str,
    max_studies: usize,
) -> String {
    match gene_report(client, genes, cancer_name, max_studies).await {
        Ok(report) => report,
        Err(e) => error_json(&format!("API error: {}", e)),
    }
}

async fn gene_report(
    client: &CbioPortalClient,
    genes: &str,
    cancer_name: &str,
    max_studies: usize,
) -> Result<String> {
    let gene_list: Vec<String> = genes
        .split(',')
        .map(|g| g.trim().to_uppercase())
        .filter(|g| !g.is_empty())
        .collect();

    if gene_list.is_empty() {
        return Ok(error_json("No gene symbols given"));
    }

    debug!("cBioPortal query: genes={}, cancer={}", genes, cancer_name);

    let study_ids = client.study_ids_matching(cancer_name, max_studies).await?;
    if study_ids.is_empty() {
        return Ok(error_json(&format!(
            "Could not find any studies matching '{}'",
            cancer_name
        )));
    }

    let gene_objects = client.fetch_genes(&gene_list).await?;
    if gene_objects.is_empty() {
        return Ok(error_json("Could not resolve gene symbols to IDs"));
    }

    let gene_ids: Vec<i64> = gene_objects.iter().map(|g| g.entrez_gene_id).collect();
    let id_to_symbol = gene_symbol_map(&gene_objects);
    debug!("Resolved {} genes across {} studies", gene_ids.len(), study_ids.len());

    // Aggregate data across all studies
    let mut all_mutations: Vec<Mutation> = Vec::new();
    let mut all_mrna: Vec<MolecularData> = Vec::new();
    let mut all_mrna_normal: Vec<MolecularData> = Vec::new();
    let mut all_protein: Vec<MolecularData> = Vec::new();
    let mut all_cna: Vec<MolecularData> = Vec::new();
    let mut all_clinical: Vec<ClinicalData> = Vec::new();
    let mut total_samples = 0usize;
    let mut studies_used: Vec<String> = Vec::new();

    for study_id in &study_ids {
        let study_data = match client.fetch_study_data(study_id, &gene_ids).await {
            Ok(Some(data)) => data,
            Ok(None) => continue,
            Err(e) => {
                warn!("Skipping study {}: {}", study_id, e);
                continue;
            }
        };

        total_samples += study_data.sample_count;
        studies_used.push(study_data.study_id);
        all_mutations.extend(study_data.mutations);
        all_mrna.extend(study_data.mrna_expression);
        all_mrna_normal.extend(study_data.mrna_normal);
        all_protein.extend(study_data.protein_expression);
        all_cna.extend(study_data.copy_number);
        all_clinical.extend(study_data.clinical_data);
    }

    if studies_used.is_empty() {
        return Ok(error_json(&format!(
            "No usable data found for '{}'",
            cancer_name
        )));
    }

    if all_mutations.is_empty() && all_mrna.is_empty() && all_protein.is_empty() && all_cna.is_empty()
    {
        return Ok(error_json("Failed to fetch any data from studies"));
    }

    let mutation_feats = mutation_features(&all_mutations, total_samples, &gene_list, &id_to_symbol);
    let expression_feats = expression_features(&all_mrna, &gene_list, &id_to_symbol, false);
    let normal_feats = expression_features(&all_mrna_normal, &gene_list, &id_to_symbol, true);
    let fold_change_feats = fold_changes(&all_mrna, &all_mrna_normal, &gene_list, &id_to_symbol);
    let protein_feats = expression_features(&all_protein, &gene_list, &id_to_symbol, false);
    let cna_feats = cna_features(&all_cna, &gene_list, &id_to_symbol);
    let clinical_summary = clinical_features(&all_clinical);

    let mut combined = Map::new();
    for gene in &gene_list {
        let mut_feat = mutation_feats.get(gene).cloned().unwrap_or_default();
        let expr_feat = expression_feats.get(gene);
        let norm_feat = normal_feats.get(gene);
        let prot_feat = protein_feats.get(gene);
        let cna_feat = cna_feats.get(gene).cloned().unwrap_or_default();

        let report = GeneReport {
            mutation_frequency: mut_feat.mutation_frequency,
            mutation_profile: mut_feat.mutation_profile,
            hotspot_mutations: mut_feat.hotspot_mutations,
            truncating_pct: mut_feat.truncating_pct,
            mrna_expression_profile: expr_feat
                .map(|f| f.expression_profile.clone())
                .unwrap_or_else(|| "N/A".to_string()),
            mrna_z_score: expr_feat
                .and_then(|f| f.z_score_profile.clone())
                .unwrap_or_else(|| "N/A".to_string()),
            mrna_normal_profile: norm_feat
                .map(|f| f.expression_profile.clone())
                .unwrap_or_else(|| "N/A".to_string()),
            mrna_fold_change: fold_change_feats
                .get(gene)
                .cloned()
                .unwrap_or_else(|| "N/A".to_string()),
            protein_expression_profile: prot_feat
                .map(|f| f.expression_profile.clone())
                .unwrap_or_else(|| "N/A".to_string()),
            cna_profile: cna_feat.cna_profile,
            cna_breakdown: cna_feat.cna_breakdown,
            amplification_pct: cna_feat.amplification_pct,
            deletion_pct: cna_feat.deletion_pct,
            sample_count: expr_feat
                .map(|f| f.sample_count)
                .or(prot_feat.map(|f| f.sample_count))
                .unwrap_or(total_samples),
            study_count: studies_used.len(),
        };

        combined.insert(gene.clone(), serde_json::to_value(report)?);
    }

    let mut data_types: Vec<&str> = Vec::new();
    if !all_mutations.is_empty() {
        data_types.push("mutations");
    }
    if !all_mrna.is_empty() {
        data_types.push("mrna_expression");
    }
    if !all_protein.is_empty() {
        data_types.push("protein_expression");
    }
    if !all_cna.is_empty() {
        data_types.push("copy_number_alterations");
    }
    if !all_clinical.is_empty() {
        data_types.push("clinical_data");
    }

    let mut metadata = Map::new();
    metadata.insert("total_samples".to_string(), total_samples.into());
    metadata.insert(
        "studies_analyzed".to_string(),
        serde_json::to_value(&studies_used)?,
    );
    metadata.insert("genes_queried".to_string(), serde_json::to_value(&gene_list)?);
    metadata.insert(
        "data_types_available".to_string(),
        serde_json::to_value(&data_types)?,
    );
    if let Some(clinical) = clinical_summary {
        metadata.insert("clinical_summary".to_string(), serde_json::to_value(clinical)?);
    }

    combined.insert("_metadata".to_string(), Value::Object(metadata));

    Ok(serde_json::to_string_pretty(&Value::Object(combined))?)
}

/// Filter a full gene report down to its protein expression fields.
///
/// Legacy protein-only view: same query, narrower output. Error documents
/// pass through unchanged.
pub fn protein_only_report(full_report: &str) -> String {
    let Ok(Value::Object(full)) = serde_json::from_str::<Value>(full_report) else {
        return error_json("Error processing results: malformed report");
    };

    if full.contains_key("error") {
        return full_report.to_string();
    }

    let metadata = full
        .get("_metadata")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let queried: Vec<String> = metadata
        .get("genes_queried")
        .and_then(Value::as_array)
        .map(|genes| {
            genes
                .iter()
                .filter_map(|g| g.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    let mut filtered = Map::new();
    for protein in &queried {
        let Some(gene_data) = full.get(protein).and_then(Value::as_object) else {
            continue;
        };
        let mut entry = Map::new();
        entry.insert(
            "protein_expression_profile".to_string(),
            gene_data
                .get("protein_expression_profile")
                .cloned()
                .unwrap_or_else(|| Value::String("N/A".to_string())),
        );
        entry.insert(
            "sample_count".to_string(),
            gene_data.get("sample_count").cloned().unwrap_or(0.into()),
        );
        entry.insert(
            "study_count".to_string(),
            gene_data.get("study_count").cloned().unwrap_or(0.into()),
        );
        filtered.insert(protein.clone(), Value::Object(entry));
    }

    let mut new_metadata = Map::new();
    new_metadata.insert(
        "total_samples".to_string(),
        metadata.get("total_samples").cloned().unwrap_or(0.into()),
    );
    new_metadata.insert(
        "studies_analyzed".to_string(),
        metadata
            .get("studies_analyzed")
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new())),
    );
    new_metadata.insert(
        "proteins_queried".to_string(),
        serde_json::to_value(&queried).unwrap_or_default(),
    );
    new_metadata.insert(
        "data_types_available".to_string(),
        metadata
            .get("data_types_available")
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new())),
    );
    filtered.insert("_metadata".to_string(), Value::Object(new_metadata));

    serde_json::to_string_pretty(&Value::Object(filtered))
        .unwrap_or_else(|e| error_json(&format!("Error processing results: {}", e)))
}

fn error_json(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}
