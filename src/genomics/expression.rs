//! mRNA and protein expression feature aggregation.
//!
//! Works for both mRNA and protein (RPPA) data; tumor values are treated as
//! z-scores, normal-tissue values as plain expression.

use super::client::MolecularData;
use super::stats::{mean, median, percentile, std_dev};
use std::collections::HashMap;

/// Expression statistics for one gene.
#[derive(Debug, Clone)]
pub struct ExpressionFeatures {
    /// mean/median/std summary (plus altered % for tumor data).
    pub expression_profile: String,
    /// z-score distribution summary; absent for normal-tissue data.
    pub z_score_profile: Option<String>,
    /// Number of values aggregated.
    pub sample_count: usize,
}

/// Group numeric values by queried gene symbol.
fn values_by_gene(
    data: &[MolecularData],
    genes: &[String],
    id_to_symbol: &HashMap<i64, String>,
) -> HashMap<String, Vec<f64>> {
    let mut by_gene: HashMap<String, Vec<f64>> = HashMap::new();
    for item in data {
        let Some(entrez_id) = item.entrez_gene_id else {
            continue;
        };
        let Some(value) = item.value else { continue };
        if let Some(symbol) = id_to_symbol.get(&entrez_id) {
            if genes.contains(symbol) {
                by_gene.entry(symbol.clone()).or_default().push(value);
            }
        }
    }
    by_gene
}

/// Calculate expression statistics for each queried gene.
///
/// Genes without data are absent from the result, signalling "no data"
/// explicitly rather than fabricating zeros.
pub fn expression_features(
    data: &[MolecularData],
    genes: &[String],
    id_to_symbol: &HashMap<i64, String>,
    is_normal: bool,
) -> HashMap<String, ExpressionFeatures> {
    let by_gene = values_by_gene(data, genes, id_to_symbol);

    let mut features = HashMap::new();
    for gene in genes {
        let Some(values) = by_gene.get(gene) else {
            continue;
        };
        if values.is_empty() {
            continue;
        }

        let mean_expr = mean(values);
        let median_expr = median(values);
        let std_expr = std_dev(values);

        if is_normal {
            features.insert(
                gene.clone(),
                ExpressionFeatures {
                    expression_profile: format!(
                        "mean:{:.2}|median:{:.2}|std:{:.2}",
                        mean_expr, median_expr, std_expr
                    ),
                    z_score_profile: None,
                    sample_count: values.len(),
                },
            );
            continue;
        }

        // Tumor values as z-scores: |z| > 2 counts as altered
        let n = values.len() as f64;
        let altered_pct = values.iter().filter(|v| v.abs() > 2.0).count() as f64 / n * 100.0;
        let high_pct = values.iter().filter(|v| **v > 2.0).count() as f64 / n * 100.0;
        let low_pct = values.iter().filter(|v| **v < -2.0).count() as f64 / n * 100.0;
        let q25 = percentile(values, 25.0);
        let q75 = percentile(values, 75.0);

        features.insert(
            gene.clone(),
            ExpressionFeatures {
                expression_profile: format!(
                    "mean:{:.2}|median:{:.2}|std:{:.2}|altered_pct:{:.2}",
                    mean_expr, median_expr, std_expr, altered_pct
                ),
                z_score_profile: Some(format!(
                    "mean_z:{:.2}|high_pct:{:.2}|low_pct:{:.2}|q25:{:.2}|q75:{:.2}",
                    mean_expr, high_pct, low_pct, q25, q75
                )),
                sample_count: values.len(),
            },
        );
    }

    features
}

/// Calculate tumor-vs-normal fold change profiles per gene.
///
/// Values are assumed log2-transformed already, so the fold change is a
/// difference of means.
pub fn fold_changes(
    tumor: &[MolecularData],
    normal: &[MolecularData],
    genes: &[String],
    id_to_symbol: &HashMap<i64, String>,
) -> HashMap<String, String> {
    let tumor_values = values_by_gene(tumor, genes, id_to_symbol);
    let normal_values = values_by_gene(normal, genes, id_to_symbol);

    let mut features = HashMap::new();
    for gene in genes {
        let (Some(tumor_vals), Some(normal_vals)) = (tumor_values.get(gene), normal_values.get(gene))
        else {
            continue;
        };
        if tumor_vals.is_empty() || normal_vals.is_empty() {
            continue;
        }

        let tumor_mean = mean(tumor_vals);
        let normal_mean = mean(normal_vals);
        let log2fc = tumor_mean - normal_mean;

        let n = tumor_vals.len() as f64;
        let up_pct = tumor_vals.iter().filter(|v| **v > normal_mean).count() as f64 / n * 100.0;
        let down_pct = tumor_vals.iter().filter(|v| **v < normal_mean).count() as f64 / n * 100.0;

        let effect = if log2fc.abs() < 0.5 {
            "minimal"
        } else if log2fc.abs() < 1.0 {
            "moderate"
        } else {
            "strong"
        };
        let direction = if log2fc > 0.0 { "up" } else { "down" };

        features.insert(
            gene.clone(),
            format!(
                "log2fc:{:.2}|{}|{}|up_pct:{:.2}|down_pct:{:.2}",
                log2fc, direction, effect, up_pct, down_pct
            ),
        );
    }

    features
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_point(entrez_id: i64, value: f64) -> MolecularData {
        MolecularData {
            entrez_gene_id: Some(entrez_id),
            value: Some(value),
        }
    }

    fn tp53_map() -> HashMap<i64, String> {
        HashMap::from([(7157, "TP53".to_string())])
    }

    fn genes() -> Vec<String> {
        vec!["TP53".to_string()]
    }

    #[test]
    fn test_tumor_z_score_profile() {
        let data: Vec<MolecularData> = [0.0, 1.0, 2.5, -3.0]
            .iter()
            .map(|v| data_point(7157, *v))
            .collect();

        let features = expression_features(&data, &genes(), &tp53_map(), false);
        let tp53 = &features["TP53"];

        assert_eq!(tp53.sample_count, 4);
        // 2.5 and -3.0 are altered: 50%
        assert!(tp53.expression_profile.ends_with("altered_pct:50.00"));
        let z = tp53.z_score_profile.as_ref().unwrap();
        assert!(z.contains("high_pct:25.00"));
        assert!(z.contains("low_pct:25.00"));
    }

    #[test]
    fn test_normal_profile_has_no_z_scores() {
        let data = vec![data_point(7157, 5.0), data_point(7157, 7.0)];
        let features = expression_features(&data, &genes(), &tp53_map(), true);
        let tp53 = &features["TP53"];

        assert!(tp53.expression_profile.starts_with("mean:6.00|median:6.00"));
        assert!(tp53.z_score_profile.is_none());
    }

    #[test]
    fn test_gene_without_data_is_absent() {
        let features = expression_features(&[], &genes(), &tp53_map(), false);
        assert!(features.is_empty());
    }

    #[test]
    fn test_fold_change_classification() {
        let tumor: Vec<MolecularData> = [8.0, 9.0, 10.0].iter().map(|v| data_point(7157, *v)).collect();
        let normal: Vec<MolecularData> = [7.0, 7.5, 7.4].iter().map(|v| data_point(7157, *v)).collect();

        let fc = fold_changes(&tumor, &normal, &genes(), &tp53_map());
        let profile = &fc["TP53"];

        // mean diff = 9.0 - 7.3 = 1.7 -> strong, up
        assert!(profile.starts_with("log2fc:1.70|up|strong"));
        assert!(profile.contains("up_pct:100.00"));
    }
}
