//! Mutation feature aggregation.

use super::client::Mutation;
use super::stats::{mean, round_to};
use std::collections::{HashMap, HashSet};

/// Mutation types counted as truncating.
const TRUNCATING_TYPES: [&str; 5] = [
    "Nonsense_Mutation",
    "Frame_Shift_Del",
    "Frame_Shift_Ins",
    "Splice_Site",
    "Translation_Start_Site",
];

/// Aggregated mutation features for one gene.
#[derive(Debug, Clone)]
pub struct MutationFeatures {
    /// Fraction of samples with a mutation in this gene.
    pub mutation_frequency: f64,
    /// Compact frequency/VAF/type summary.
    pub mutation_profile: String,
    /// Recurrent protein changes, e.g. "V600E(45)".
    pub hotspot_mutations: String,
    /// Percentage of truncating mutations.
    pub truncating_pct: f64,
}

impl Default for MutationFeatures {
    fn default() -> Self {
        Self {
            mutation_frequency: 0.0,
            mutation_profile: "freq:0.00".to_string(),
            hotspot_mutations: "None".to_string(),
            truncating_pct: 0.0,
        }
    }
}

/// Calculate mutation features for each queried gene.
pub fn mutation_features(
    mutations: &[Mutation],
    total_samples: usize,
    genes: &[String],
    id_to_symbol: &HashMap<i64, String>,
) -> HashMap<String, MutationFeatures> {
    let mut by_gene: HashMap<String, Vec<&Mutation>> =
        genes.iter().map(|g| (g.clone(), Vec::new())).collect();

    for mutation in mutations {
        let Some(entrez_id) = mutation.entrez_gene_id else {
            continue;
        };
        if let Some(symbol) = id_to_symbol.get(&entrez_id) {
            if let Some(bucket) = by_gene.get_mut(symbol) {
                bucket.push(mutation);
            }
        }
    }

    let mut features = HashMap::new();
    for gene in genes {
        let gene_mutations = &by_gene[gene];
        if gene_mutations.is_empty() {
            features.insert(gene.clone(), MutationFeatures::default());
            continue;
        }

        // Frequency over distinct mutated patients
        let unique_patients: HashSet<&str> = gene_mutations
            .iter()
            .filter_map(|m| m.patient_id.as_deref())
            .collect();
        let frequency = if total_samples > 0 {
            unique_patients.len() as f64 / total_samples as f64
        } else {
            0.0
        };

        // Average variant allele frequency
        let vaf_values: Vec<f64> = gene_mutations
            .iter()
            .filter_map(|m| {
                let alt = m.tumor_alt_count.unwrap_or(0);
                let total = alt + m.tumor_ref_count.unwrap_or(0);
                (total > 0).then(|| alt as f64 / total as f64)
            })
            .collect();
        let avg_vaf = mean(&vaf_values);

        let mutation_types: Vec<&str> = gene_mutations
            .iter()
            .map(|m| m.mutation_type.as_deref().unwrap_or("Unknown"))
            .collect();
        let type_counts = ranked_counts(mutation_types.iter().copied());

        let truncating_count = mutation_types
            .iter()
            .filter(|t| TRUNCATING_TYPES.contains(t))
            .count();
        let truncating_pct = (truncating_count as f64 / gene_mutations.len() as f64) * 100.0;

        // Protein changes, e.g. "p.V600E" -> "V600E"
        let protein_changes: Vec<String> = gene_mutations
            .iter()
            .filter_map(|m| m.protein_change.as_deref())
            .filter(|c| !c.is_empty() && *c != "NA")
            .map(|c| c.replace("p.", "").trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();

        // Hotspots: changes recurring in >2% of this gene's mutations
        let hotspot_threshold =
            (gene_mutations.len() as f64 * 0.02).max(2.0);
        let hotspots: Vec<String> = ranked_counts(protein_changes.iter().map(String::as_str))
            .into_iter()
            .take(5)
            .filter(|(_, count)| *count as f64 >= hotspot_threshold)
            .map(|(change, count)| format!("{}({})", change, count))
            .collect();
        let hotspot_str = if hotspots.is_empty() {
            "None".to_string()
        } else {
            hotspots[..hotspots.len().min(3)].join("|")
        };

        let type_dist = type_counts
            .iter()
            .take(3)
            .map(|(t, c)| format!("{}:{}", t, c))
            .collect::<Vec<_>>()
            .join("|");

        features.insert(
            gene.clone(),
            MutationFeatures {
                mutation_frequency: round_to(frequency, 4),
                mutation_profile: format!(
                    "freq:{:.2}|vaf:{:.2}|types:{}",
                    frequency, avg_vaf, type_dist
                ),
                hotspot_mutations: hotspot_str,
                truncating_pct: round_to(truncating_pct, 2),
            },
        );
    }

    features
}

/// Count occurrences, ranked by count descending with first-seen order
/// breaking ties.
fn ranked_counts<'a>(items: impl Iterator<Item = &'a str>) -> Vec<(String, usize)> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();

    for item in items {
        if !counts.contains_key(item) {
            order.push(item.to_string());
        }
        *counts.entry(item.to_string()).or_insert(0) += 1;
    }

    let mut ranked: Vec<(String, usize)> = order
        .into_iter()
        .map(|item| {
            let count = counts[&item];
            (item, count)
        })
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mutation(patient: &str, mut_type: &str, protein_change: Option<&str>) -> Mutation {
        Mutation {
            entrez_gene_id: Some(673),
            patient_id: Some(patient.to_string()),
            mutation_type: Some(mut_type.to_string()),
            protein_change: protein_change.map(|c| c.to_string()),
            tumor_alt_count: Some(30),
            tumor_ref_count: Some(70),
        }
    }

    fn braf_map() -> HashMap<i64, String> {
        HashMap::from([(673, "BRAF".to_string())])
    }

    #[test]
    fn test_empty_gene_gets_defaults() {
        let features = mutation_features(&[], 100, &["BRAF".to_string()], &braf_map());
        let braf = &features["BRAF"];
        assert_eq!(braf.mutation_frequency, 0.0);
        assert_eq!(braf.mutation_profile, "freq:0.00");
        assert_eq!(braf.hotspot_mutations, "None");
    }

    #[test]
    fn test_frequency_counts_unique_patients() {
        let mutations = vec![
            mutation("P1", "Missense_Mutation", Some("p.V600E")),
            mutation("P1", "Missense_Mutation", Some("p.V600E")),
            mutation("P2", "Nonsense_Mutation", Some("p.Q61*")),
        ];
        let features = mutation_features(&mutations, 10, &["BRAF".to_string()], &braf_map());
        let braf = &features["BRAF"];

        // 2 unique patients out of 10 samples
        assert_eq!(braf.mutation_frequency, 0.2);
        assert!(braf.mutation_profile.starts_with("freq:0.20|vaf:0.30"));
        // 1 truncating of 3 mutations
        assert_eq!(braf.truncating_pct, 33.33);
    }

    #[test]
    fn test_hotspot_detection() {
        let mut mutations: Vec<Mutation> = (0..8)
            .map(|i| mutation(&format!("P{}", i), "Missense_Mutation", Some("p.V600E")))
            .collect();
        mutations.push(mutation("P9", "Missense_Mutation", Some("p.D594G")));

        let features = mutation_features(&mutations, 20, &["BRAF".to_string()], &braf_map());
        // V600E recurs 8 times, D594G only once (below the threshold of 2)
        assert_eq!(features["BRAF"].hotspot_mutations, "V600E(8)");
    }
}
