//! cBioPortal REST API client.
//!
//! A thin typed client over the public endpoints the feature aggregation
//! needs: study search, gene resolution, molecular profile and sample-list
//! discovery, and the mutation/molecular/clinical data fetches.

use crate::error::Result;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::warn;

/// Cancer study summary.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancerStudy {
    pub study_id: String,
    #[serde(default)]
    pub all_sample_count: Option<u64>,
}

/// A gene with its Entrez ID and HUGO symbol.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gene {
    pub entrez_gene_id: i64,
    pub hugo_gene_symbol: String,
}

/// A molecular profile available in a study.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MolecularProfile {
    pub molecular_profile_id: String,
    #[serde(default)]
    pub molecular_alteration_type: String,
}

/// A sample list within a study.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleList {
    pub sample_list_id: String,
    #[serde(default)]
    pub sample_ids: Vec<String>,
}

/// One mutation record (DETAILED projection).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mutation {
    #[serde(default)]
    pub entrez_gene_id: Option<i64>,
    #[serde(default)]
    pub patient_id: Option<String>,
    #[serde(default)]
    pub mutation_type: Option<String>,
    #[serde(default)]
    pub protein_change: Option<String>,
    #[serde(default)]
    pub tumor_alt_count: Option<i64>,
    #[serde(default)]
    pub tumor_ref_count: Option<i64>,
}

/// One molecular data point (expression, CNA).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MolecularData {
    #[serde(default)]
    pub entrez_gene_id: Option<i64>,
    #[serde(default, deserialize_with = "de_numeric")]
    pub value: Option<f64>,
}

/// One clinical data point.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalData {
    #[serde(default)]
    pub patient_id: Option<String>,
    #[serde(default)]
    pub clinical_attribute_id: Option<String>,
    #[serde(default, deserialize_with = "de_stringish")]
    pub value: Option<String>,
}

/// The API serves numeric values as numbers or strings depending on the
/// study; accept both.
fn de_numeric<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }))
}

fn de_stringish<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }))
}

/// Molecular profile and sample-list IDs selected for a study.
#[derive(Debug, Clone, Default)]
pub struct ProfileIds {
    pub mutation: Option<String>,
    pub mrna: Option<String>,
    pub protein: Option<String>,
    pub cna: Option<String>,
    pub sample_list: Option<String>,
}

/// All data fetched from a single study.
#[derive(Debug, Default)]
pub struct StudyData {
    pub study_id: String,
    pub sample_count: usize,
    pub mutations: Vec<Mutation>,
    pub mrna_expression: Vec<MolecularData>,
    pub mrna_normal: Vec<MolecularData>,
    pub protein_expression: Vec<MolecularData>,
    pub copy_number: Vec<MolecularData>,
    pub clinical_data: Vec<ClinicalData>,
}

/// Client for the cBioPortal REST API.
pub struct CbioPortalClient {
    http: reqwest::Client,
    base_url: String,
}

impl CbioPortalClient {
    /// Create a client against the given API base URL.
    pub fn new(base_url: &str, timeout_seconds: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent(concat!("svar/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Study IDs matching a cancer keyword, largest studies first.
    pub async fn study_ids_matching(
        &self,
        keyword: &str,
        max_studies: usize,
    ) -> Result<Vec<String>> {
        let mut studies: Vec<CancerStudy> = self
            .http
            .get(format!("{}/studies", self.base_url))
            .query(&[
                ("keyword", keyword),
                ("projection", "SUMMARY"),
                ("pageSize", "20"),
                ("pageNumber", "0"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        studies.sort_by_key(|s| std::cmp::Reverse(s.all_sample_count.unwrap_or(0)));

        Ok(studies
            .into_iter()
            .take(max_studies)
            .map(|s| s.study_id)
            .collect())
    }

    /// Resolve HUGO gene symbols to gene objects.
    pub async fn fetch_genes(&self, symbols: &[String]) -> Result<Vec<Gene>> {
        let genes: Vec<Gene> = self
            .http
            .post(format!("{}/genes/fetch", self.base_url))
            .query(&[("geneIdType", "HUGO_GENE_SYMBOL")])
            .json(symbols)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(genes)
    }

    /// Select molecular profile IDs and a sample list for a study.
    pub async fn profile_ids(&self, study_id: &str) -> Result<ProfileIds> {
        let profiles: Vec<MolecularProfile> = self
            .http
            .get(format!(
                "{}/studies/{}/molecular-profiles",
                self.base_url, study_id
            ))
            .query(&[("projection", "SUMMARY")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let sample_lists: Vec<SampleList> = self
            .http
            .get(format!("{}/studies/{}/sample-lists", self.base_url, study_id))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(select_profiles(&profiles, &sample_lists))
    }

    /// Normal/control sample list ID if the study has one.
    pub async fn normal_sample_list(&self, study_id: &str) -> Result<Option<String>> {
        let sample_lists: Vec<SampleList> = self
            .http
            .get(format!("{}/studies/{}/sample-lists", self.base_url, study_id))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(select_normal_list(&sample_lists))
    }

    /// Number of samples in a sample list.
    pub async fn sample_count(&self, sample_list_id: &str) -> Result<usize> {
        let list: SampleList = self
            .http
            .get(format!("{}/sample-lists/{}", self.base_url, sample_list_id))
            .query(&[("projection", "DETAILED")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(list.sample_ids.len())
    }

    /// Mutations for the given genes in a mutation profile.
    pub async fn fetch_mutations(
        &self,
        profile_id: &str,
        sample_list_id: &str,
        gene_ids: &[i64],
    ) -> Result<Vec<Mutation>> {
        let mutations: Vec<Mutation> = self
            .http
            .post(format!(
                "{}/molecular-profiles/{}/mutations/fetch",
                self.base_url, profile_id
            ))
            .query(&[("projection", "DETAILED")])
            .json(&serde_json::json!({
                "sampleListId": sample_list_id,
                "entrezGeneIds": gene_ids,
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(mutations)
    }

    /// Molecular data (expression, CNA) for the given genes in a profile.
    pub async fn fetch_molecular_data(
        &self,
        profile_id: &str,
        sample_list_id: &str,
        gene_ids: &[i64],
    ) -> Result<Vec<MolecularData>> {
        let data: Vec<MolecularData> = self
            .http
            .post(format!(
                "{}/molecular-profiles/{}/molecular-data/fetch",
                self.base_url, profile_id
            ))
            .query(&[("projection", "SUMMARY")])
            .json(&serde_json::json!({
                "sampleListId": sample_list_id,
                "entrezGeneIds": gene_ids,
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(data)
    }

    /// Patient-level clinical data for a study.
    pub async fn fetch_clinical_data(&self, study_id: &str) -> Result<Vec<ClinicalData>> {
        let data: Vec<ClinicalData> = self
            .http
            .get(format!("{}/studies/{}/clinical-data", self.base_url, study_id))
            .query(&[("clinicalDataType", "PATIENT"), ("projection", "SUMMARY")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(data)
    }

    /// Fetch all available data types for a study.
    ///
    /// Returns `Ok(None)` when the study has no usable sample list or no
    /// samples. Individual data-type fetch failures degrade to empty data for
    /// that type so one flaky endpoint does not discard the whole study.
    pub async fn fetch_study_data(
        &self,
        study_id: &str,
        gene_ids: &[i64],
    ) -> Result<Option<StudyData>> {
        let profiles = self.profile_ids(study_id).await?;

        let Some(sample_list) = profiles.sample_list.clone() else {
            return Ok(None);
        };

        let sample_count = self.sample_count(&sample_list).await?;
        if sample_count == 0 {
            return Ok(None);
        }

        let mut data = StudyData {
            study_id: study_id.to_string(),
            sample_count,
            ..Default::default()
        };

        if let Some(profile) = &profiles.mutation {
            data.mutations = self
                .fetch_mutations(profile, &sample_list, gene_ids)
                .await
                .unwrap_or_else(|e| {
                    warn!("Mutation fetch failed for {}: {}", study_id, e);
                    Vec::new()
                });
        }

        if let Some(profile) = &profiles.mrna {
            data.mrna_expression = self
                .fetch_molecular_data(profile, &sample_list, gene_ids)
                .await
                .unwrap_or_else(|e| {
                    warn!("mRNA fetch failed for {}: {}", study_id, e);
                    Vec::new()
                });

            if let Ok(Some(normal_list)) = self.normal_sample_list(study_id).await {
                data.mrna_normal = self
                    .fetch_molecular_data(profile, &normal_list, gene_ids)
                    .await
                    .unwrap_or_default();
            }
        }

        if let Some(profile) = &profiles.protein {
            data.protein_expression = self
                .fetch_molecular_data(profile, &sample_list, gene_ids)
                .await
                .unwrap_or_else(|e| {
                    warn!("Protein fetch failed for {}: {}", study_id, e);
                    Vec::new()
                });
        }

        if let Some(profile) = &profiles.cna {
            data.copy_number = self
                .fetch_molecular_data(profile, &sample_list, gene_ids)
                .await
                .unwrap_or_else(|e| {
                    warn!("CNA fetch failed for {}: {}", study_id, e);
                    Vec::new()
                });
        }

        data.clinical_data = self
            .fetch_clinical_data(study_id)
            .await
            .unwrap_or_else(|e| {
                warn!("Clinical fetch failed for {}: {}", study_id, e);
                Vec::new()
            });

        Ok(Some(data))
    }
}

/// Build a gene ID -> uppercase symbol map.
pub fn gene_symbol_map(genes: &[Gene]) -> HashMap<i64, String> {
    genes
        .iter()
        .map(|g| (g.entrez_gene_id, g.hugo_gene_symbol.to_uppercase()))
        .collect()
}

/// Pick the profiles and sample list to use for a study.
///
/// Preferences: mRNA profiles whose ids mention rna_seq/mrna, CNA profiles
/// whose ids mention gistic/cna, RNA-seq sample lists over the catch-all
/// `_all` list, with first-listed fallbacks throughout.
fn select_profiles(profiles: &[MolecularProfile], sample_lists: &[SampleList]) -> ProfileIds {
    let mutation = profiles
        .iter()
        .find(|p| p.molecular_alteration_type == "MUTATION_EXTENDED")
        .map(|p| p.molecular_profile_id.clone());

    let mrna_profiles: Vec<&MolecularProfile> = profiles
        .iter()
        .filter(|p| p.molecular_alteration_type == "MRNA_EXPRESSION")
        .collect();
    let mrna = mrna_profiles
        .iter()
        .find(|p| {
            let id = p.molecular_profile_id.to_lowercase();
            id.contains("rna_seq") || id.contains("mrna")
        })
        .or(mrna_profiles.first())
        .map(|p| p.molecular_profile_id.clone());

    let protein = profiles
        .iter()
        .find(|p| {
            matches!(
                p.molecular_alteration_type.as_str(),
                "PROTEIN_LEVEL" | "PROTEIN_ARRAY_PROTEIN_LEVEL"
            )
        })
        .map(|p| p.molecular_profile_id.clone());

    let cna_profiles: Vec<&MolecularProfile> = profiles
        .iter()
        .filter(|p| p.molecular_alteration_type == "COPY_NUMBER_ALTERATION")
        .collect();
    let cna = cna_profiles
        .iter()
        .find(|p| {
            let id = p.molecular_profile_id.to_lowercase();
            id.contains("gistic") || id.contains("cna")
        })
        .or(cna_profiles.first())
        .map(|p| p.molecular_profile_id.clone());

    let sample_list = sample_lists
        .iter()
        .find(|s| s.sample_list_id.to_lowercase().contains("rna_seq"))
        .or_else(|| sample_lists.iter().find(|s| s.sample_list_id.contains("_all")))
        .or_else(|| sample_lists.first())
        .map(|s| s.sample_list_id.clone());

    ProfileIds {
        mutation,
        mrna,
        protein,
        cna,
        sample_list,
    }
}

/// Find a normal/control sample list.
fn select_normal_list(sample_lists: &[SampleList]) -> Option<String> {
    sample_lists
        .iter()
        .find(|s| {
            let id = s.sample_list_id.to_lowercase();
            ["normal", "control", "adj", "solid_tissue_normal"]
                .iter()
                .any(|keyword| id.contains(keyword))
        })
        .map(|s| s.sample_list_id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(id: &str, alteration: &str) -> MolecularProfile {
        MolecularProfile {
            molecular_profile_id: id.to_string(),
            molecular_alteration_type: alteration.to_string(),
        }
    }

    fn sample_list(id: &str) -> SampleList {
        SampleList {
            sample_list_id: id.to_string(),
            sample_ids: Vec::new(),
        }
    }

    #[test]
    fn test_select_profiles_prefers_rna_seq_and_gistic() {
        let profiles = vec![
            profile("acc_tcga_mutations", "MUTATION_EXTENDED"),
            profile("acc_tcga_mrna_array", "MRNA_EXPRESSION"),
            profile("acc_tcga_rna_seq_v2_mrna", "MRNA_EXPRESSION"),
            profile("acc_tcga_linear_cna", "COPY_NUMBER_ALTERATION"),
            profile("acc_tcga_gistic", "COPY_NUMBER_ALTERATION"),
            profile("acc_tcga_rppa", "PROTEIN_LEVEL"),
        ];
        let lists = vec![
            sample_list("acc_tcga_all"),
            sample_list("acc_tcga_rna_seq_v2_mrna"),
        ];

        let ids = select_profiles(&profiles, &lists);
        assert_eq!(ids.mutation.as_deref(), Some("acc_tcga_mutations"));
        // "mrna" appears in the array profile id too, so first match wins
        assert_eq!(ids.mrna.as_deref(), Some("acc_tcga_mrna_array"));
        assert_eq!(ids.cna.as_deref(), Some("acc_tcga_linear_cna"));
        assert_eq!(ids.protein.as_deref(), Some("acc_tcga_rppa"));
        assert_eq!(ids.sample_list.as_deref(), Some("acc_tcga_rna_seq_v2_mrna"));
    }

    #[test]
    fn test_select_profiles_falls_back_to_first() {
        let profiles = vec![profile("study_other_expr", "MRNA_EXPRESSION")];
        let lists = vec![sample_list("study_sequenced")];

        let ids = select_profiles(&profiles, &lists);
        assert_eq!(ids.mrna.as_deref(), Some("study_other_expr"));
        assert!(ids.mutation.is_none());
        assert_eq!(ids.sample_list.as_deref(), Some("study_sequenced"));
    }

    #[test]
    fn test_select_normal_list() {
        let lists = vec![
            sample_list("brca_tcga_all"),
            sample_list("brca_tcga_solid_tissue_normal"),
        ];
        assert_eq!(
            select_normal_list(&lists).as_deref(),
            Some("brca_tcga_solid_tissue_normal")
        );
        assert!(select_normal_list(&lists[..1]).is_none());
    }

    #[test]
    fn test_molecular_data_value_accepts_number_or_string() {
        let from_number: MolecularData =
            serde_json::from_str(r#"{"entrezGeneId": 7157, "value": -1.5}"#).unwrap();
        assert_eq!(from_number.value, Some(-1.5));

        let from_string: MolecularData =
            serde_json::from_str(r#"{"entrezGeneId": 7157, "value": "2.25"}"#).unwrap();
        assert_eq!(from_string.value, Some(2.25));

        let from_junk: MolecularData =
            serde_json::from_str(r#"{"entrezGeneId": 7157, "value": "NA"}"#).unwrap();
        assert_eq!(from_junk.value, None);
    }
}
