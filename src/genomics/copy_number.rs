//! Copy number alteration (CNA) feature aggregation.
//!
//! GISTIC-style values: -2 deep deletion, -1 shallow deletion, 0 neutral,
//! 1 low-level gain, 2 high-level amplification.

use super::client::MolecularData;
use super::stats::round_to;
use std::collections::HashMap;

/// CNA features for one gene.
#[derive(Debug, Clone)]
pub struct CnaFeatures {
    /// amp/del/neutral percentages with the dominant call.
    pub cna_profile: String,
    /// Full five-level breakdown.
    pub cna_breakdown: String,
    /// % samples with gain or amplification.
    pub amplification_pct: f64,
    /// % samples with any deletion.
    pub deletion_pct: f64,
    /// % samples with any non-neutral call.
    pub cna_alteration_pct: f64,
    /// Mean copy number level.
    pub mean_cna_level: f64,
}

impl Default for CnaFeatures {
    fn default() -> Self {
        Self {
            cna_profile: "N/A".to_string(),
            cna_breakdown: "N/A".to_string(),
            amplification_pct: 0.0,
            deletion_pct: 0.0,
            cna_alteration_pct: 0.0,
            mean_cna_level: 0.0,
        }
    }
}

/// Calculate CNA features for each queried gene.
pub fn cna_features(
    cna_data: &[MolecularData],
    genes: &[String],
    id_to_symbol: &HashMap<i64, String>,
) -> HashMap<String, CnaFeatures> {
    let mut by_gene: HashMap<String, Vec<i64>> = HashMap::new();
    for item in cna_data {
        let Some(entrez_id) = item.entrez_gene_id else {
            continue;
        };
        let Some(value) = item.value else { continue };
        if let Some(symbol) = id_to_symbol.get(&entrez_id) {
            if genes.contains(symbol) {
                by_gene.entry(symbol.clone()).or_default().push(value as i64);
            }
        }
    }

    let mut features = HashMap::new();
    for gene in genes {
        let Some(values) = by_gene.get(gene).filter(|v| !v.is_empty()) else {
            features.insert(gene.clone(), CnaFeatures::default());
            continue;
        };

        let n = values.len() as f64;
        let deep_deletion = values.iter().filter(|v| **v == -2).count();
        let shallow_deletion = values.iter().filter(|v| **v == -1).count();
        let neutral = values.iter().filter(|v| **v == 0).count();
        let gain = values.iter().filter(|v| **v == 1).count();
        let amplification = values.iter().filter(|v| **v == 2).count();

        let deep_del_pct = deep_deletion as f64 / n * 100.0;
        let shallow_del_pct = shallow_deletion as f64 / n * 100.0;
        let any_deletion_pct = (deep_deletion + shallow_deletion) as f64 / n * 100.0;
        let gain_pct = gain as f64 / n * 100.0;
        let amp_pct = amplification as f64 / n * 100.0;
        let any_amplification_pct = (gain + amplification) as f64 / n * 100.0;
        let neutral_pct = neutral as f64 / n * 100.0;
        let altered_pct = (values.len() - neutral) as f64 / n * 100.0;

        let mean_cna = values.iter().sum::<i64>() as f64 / n;

        let dominant = if amplification > deep_deletion.max(shallow_deletion).max(gain).max(neutral)
        {
            "high_amp"
        } else if gain > deep_deletion.max(shallow_deletion).max(neutral) {
            "gain"
        } else if deep_deletion > shallow_deletion.max(neutral) {
            "deep_del"
        } else if shallow_deletion > neutral {
            "shallow_del"
        } else {
            "neutral"
        };

        features.insert(
            gene.clone(),
            CnaFeatures {
                cna_profile: format!(
                    "amp:{:.1}%|del:{:.1}%|neutral:{:.1}%|dominant:{}",
                    amp_pct, any_deletion_pct, neutral_pct, dominant
                ),
                cna_breakdown: format!(
                    "deep_del:{:.1}%|shallow_del:{:.1}%|neutral:{:.1}%|gain:{:.1}%|high_amp:{:.1}%",
                    deep_del_pct, shallow_del_pct, neutral_pct, gain_pct, amp_pct
                ),
                amplification_pct: round_to(any_amplification_pct, 2),
                deletion_pct: round_to(any_deletion_pct, 2),
                cna_alteration_pct: round_to(altered_pct, 2),
                mean_cna_level: round_to(mean_cna, 2),
            },
        );
    }

    features
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_point(value: f64) -> MolecularData {
        MolecularData {
            entrez_gene_id: Some(2064),
            value: Some(value),
        }
    }

    fn erbb2_map() -> HashMap<i64, String> {
        HashMap::from([(2064, "ERBB2".to_string())])
    }

    fn genes() -> Vec<String> {
        vec!["ERBB2".to_string()]
    }

    #[test]
    fn test_amplification_dominant() {
        let data: Vec<MolecularData> = [2.0, 2.0, 2.0, 1.0, 0.0, -1.0]
            .iter()
            .map(|v| data_point(*v))
            .collect();

        let features = cna_features(&data, &genes(), &erbb2_map());
        let erbb2 = &features["ERBB2"];

        assert!(erbb2.cna_profile.contains("dominant:high_amp"));
        // 3 amp + 1 gain of 6 samples
        assert_eq!(erbb2.amplification_pct, 66.67);
        assert_eq!(erbb2.deletion_pct, 16.67);
        assert_eq!(erbb2.cna_alteration_pct, 83.33);
        assert!(erbb2
            .cna_breakdown
            .starts_with("deep_del:0.0%|shallow_del:16.7%|neutral:16.7%"));
    }

    #[test]
    fn test_neutral_dominant() {
        let data: Vec<MolecularData> = [0.0, 0.0, 0.0, 1.0].iter().map(|v| data_point(*v)).collect();
        let features = cna_features(&data, &genes(), &erbb2_map());
        assert!(features["ERBB2"].cna_profile.contains("dominant:neutral"));
    }

    #[test]
    fn test_missing_gene_gets_na() {
        let features = cna_features(&[], &genes(), &erbb2_map());
        assert_eq!(features["ERBB2"].cna_profile, "N/A");
        assert_eq!(features["ERBB2"].amplification_pct, 0.0);
    }
}
