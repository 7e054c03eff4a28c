//! Clinical/demographic feature aggregation.

use super::client::ClinicalData;
use super::stats::{mean, median, round_to, std_dev};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

const AGE_ATTRIBUTES: [&str; 4] = ["AGE", "AGE_AT_DIAGNOSIS", "AGE_AT_SEQUENCING", "PATIENT_AGE"];
const SURVIVAL_ATTRIBUTES: [&str; 3] = ["OS_MONTHS", "OVERALL_SURVIVAL_MONTHS", "SURVIVAL_MONTHS"];
const STATUS_ATTRIBUTES: [&str; 3] = ["OS_STATUS", "OVERALL_SURVIVAL_STATUS", "VITAL_STATUS"];
const STAGE_ATTRIBUTES: [&str; 5] = [
    "STAGE",
    "TUMOR_STAGE",
    "AJCC_STAGE",
    "PATHOLOGIC_STAGE",
    "CLINICAL_STAGE",
];
const GRADE_ATTRIBUTES: [&str; 3] = ["GRADE", "TUMOR_GRADE", "HISTOLOGICAL_GRADE"];
const DECEASED_KEYWORDS: [&str; 3] = ["DECEASED", "DEAD", "1:DECEASED"];

/// Summary of clinical demographics across aggregated studies.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClinicalSummary {
    pub total_patients: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_mean: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_median: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_std: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub survival_median_months: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub survival_mean_months: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub survival_range_months: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patients_with_survival_data: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mortality_rate: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_distribution: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patients_with_stage_data: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade_distribution: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patients_with_grade_data: Option<usize>,

    pub clinical_attributes_available: Vec<String>,
}

/// Calculate clinical features from patient data.
///
/// Returns `None` when no clinical data was fetched at all.
pub fn clinical_features(clinical_data: &[ClinicalData]) -> Option<ClinicalSummary> {
    if clinical_data.is_empty() {
        return None;
    }

    let total_patients = clinical_data
        .iter()
        .filter_map(|d| d.patient_id.as_deref())
        .collect::<HashSet<_>>()
        .len();

    // Group values by attribute
    let mut attributes: HashMap<&str, Vec<&str>> = HashMap::new();
    for item in clinical_data {
        if let (Some(attr), Some(value)) =
            (item.clinical_attribute_id.as_deref(), item.value.as_deref())
        {
            if !value.is_empty() {
                attributes.entry(attr).or_default().push(value);
            }
        }
    }

    let mut summary = ClinicalSummary {
        total_patients,
        ..Default::default()
    };

    if let Some(values) = first_present(&attributes, &AGE_ATTRIBUTES) {
        let ages: Vec<f64> = values
            .iter()
            .filter_map(|v| v.trim().parse::<f64>().ok())
            .filter(|age| *age > 0.0 && *age < 120.0)
            .collect();

        if !ages.is_empty() {
            summary.age_mean = Some(round_to(mean(&ages), 1));
            summary.age_median = Some(round_to(median(&ages), 1));
            summary.age_range = Some(format!(
                "{}-{}",
                ages.iter().cloned().fold(f64::INFINITY, f64::min) as i64,
                ages.iter().cloned().fold(f64::NEG_INFINITY, f64::max) as i64
            ));
            summary.age_std = Some(round_to(std_dev(&ages), 1));
            summary
                .clinical_attributes_available
                .push("age".to_string());
        }
    }

    if let Some(values) = first_present(&attributes, &SURVIVAL_ATTRIBUTES) {
        let months: Vec<f64> = values
            .iter()
            .filter_map(|v| v.trim().parse::<f64>().ok())
            .filter(|m| *m >= 0.0)
            .collect();

        if !months.is_empty() {
            summary.survival_median_months = Some(round_to(median(&months), 1));
            summary.survival_mean_months = Some(round_to(mean(&months), 1));
            summary.survival_range_months = Some(format!(
                "{:.1}-{:.1}",
                months.iter().cloned().fold(f64::INFINITY, f64::min),
                months.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
            ));
            summary.patients_with_survival_data = Some(months.len());
            summary
                .clinical_attributes_available
                .push("survival".to_string());
        }
    }

    if let Some(statuses) = first_present(&attributes, &STATUS_ATTRIBUTES) {
        if !statuses.is_empty() {
            let deceased = statuses
                .iter()
                .filter(|s| {
                    let upper = s.to_uppercase();
                    DECEASED_KEYWORDS.iter().any(|k| upper.contains(k))
                })
                .count();
            summary.mortality_rate =
                Some(round_to(deceased as f64 / statuses.len() as f64 * 100.0, 1));
        }
    }

    if let Some(values) = first_present(&attributes, &STAGE_ATTRIBUTES) {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for value in values {
            if let Some(stage) = classify_stage(value) {
                *counts.entry(stage).or_insert(0) += 1;
            }
        }

        let total_staged: usize = counts.values().sum();
        if total_staged > 0 {
            let distribution = counts
                .iter()
                .map(|(stage, count)| {
                    (
                        format!("stage_{}", stage),
                        format!("{} ({:.1}%)", count, *count as f64 / total_staged as f64 * 100.0),
                    )
                })
                .collect();
            summary.stage_distribution = Some(distribution);
            summary.patients_with_stage_data = Some(total_staged);
            summary
                .clinical_attributes_available
                .push("stage".to_string());
        }
    }

    if let Some(values) = first_present(&attributes, &GRADE_ATTRIBUTES) {
        let mut counts: BTreeMap<char, usize> = BTreeMap::new();
        for value in values {
            if let Some(grade) = value.chars().find(|c| ('1'..='4').contains(c)) {
                *counts.entry(grade).or_insert(0) += 1;
            }
        }

        let total_graded: usize = counts.values().sum();
        if total_graded > 0 {
            let distribution = counts
                .iter()
                .map(|(grade, count)| {
                    (
                        format!("grade_{}", grade),
                        format!("{} ({:.1}%)", count, *count as f64 / total_graded as f64 * 100.0),
                    )
                })
                .collect();
            summary.grade_distribution = Some(distribution);
            summary.patients_with_grade_data = Some(total_graded);
            summary
                .clinical_attributes_available
                .push("grade".to_string());
        }
    }

    Some(summary)
}

/// First attribute from `candidates` present in the data.
fn first_present<'a>(
    attributes: &'a HashMap<&str, Vec<&'a str>>,
    candidates: &[&'a str],
) -> Option<&'a Vec<&'a str>> {
    candidates.iter().find_map(|c| attributes.get(c))
}

/// Classify a free-form stage value into a broad roman-numeral category.
fn classify_stage(value: &str) -> Option<&'static str> {
    let normalized = value.to_uppercase().replace("STAGE", "");
    let normalized = normalized.trim();

    // Longest numeral first so "III" is not read as "I"
    if normalized.starts_with("IV") {
        Some("IV")
    } else if normalized.starts_with("III") {
        Some("III")
    } else if normalized.starts_with("II") {
        Some("II")
    } else if normalized.starts_with('I') {
        Some("I")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(patient: &str, attr: &str, value: &str) -> ClinicalData {
        ClinicalData {
            patient_id: Some(patient.to_string()),
            clinical_attribute_id: Some(attr.to_string()),
            value: Some(value.to_string()),
        }
    }

    #[test]
    fn test_empty_data_is_none() {
        assert!(clinical_features(&[]).is_none());
    }

    #[test]
    fn test_age_and_survival() {
        let data = vec![
            record("P1", "AGE", "60"),
            record("P2", "AGE", "70"),
            record("P3", "AGE", "250"), // out of range, ignored
            record("P1", "OS_MONTHS", "24.5"),
            record("P2", "OS_MONTHS", "12.0"),
            record("P1", "OS_STATUS", "1:DECEASED"),
            record("P2", "OS_STATUS", "0:LIVING"),
        ];

        let summary = clinical_features(&data).unwrap();
        assert_eq!(summary.total_patients, 3);
        assert_eq!(summary.age_mean, Some(65.0));
        assert_eq!(summary.age_range.as_deref(), Some("60-70"));
        assert_eq!(summary.survival_median_months, Some(18.3));
        assert_eq!(summary.mortality_rate, Some(50.0));
        assert_eq!(
            summary.clinical_attributes_available,
            vec!["age", "survival"]
        );
    }

    #[test]
    fn test_stage_classification() {
        assert_eq!(classify_stage("Stage IIIA"), Some("III"));
        assert_eq!(classify_stage("STAGE IV"), Some("IV"));
        assert_eq!(classify_stage("IIB"), Some("II"));
        assert_eq!(classify_stage("I"), Some("I"));
        assert_eq!(classify_stage("Unknown"), None);
    }

    #[test]
    fn test_stage_distribution() {
        let data = vec![
            record("P1", "AJCC_STAGE", "Stage I"),
            record("P2", "AJCC_STAGE", "Stage IIIA"),
            record("P3", "AJCC_STAGE", "Stage IIIB"),
            record("P4", "AJCC_STAGE", "N/A"),
        ];

        let summary = clinical_features(&data).unwrap();
        let distribution = summary.stage_distribution.unwrap();
        assert_eq!(distribution["stage_I"], "1 (33.3%)");
        assert_eq!(distribution["stage_III"], "2 (66.7%)");
        assert_eq!(summary.patients_with_stage_data, Some(3));
    }

    #[test]
    fn test_grade_distribution() {
        let data = vec![
            record("P1", "GRADE", "G2"),
            record("P2", "GRADE", "G2"),
            record("P3", "GRADE", "3"),
        ];

        let summary = clinical_features(&data).unwrap();
        let distribution = summary.grade_distribution.unwrap();
        assert_eq!(distribution["grade_2"], "2 (66.7%)");
        assert_eq!(distribution["grade_3"], "1 (33.3%)");
    }
}
