use serde::Serialize;

use crate::data::model::CandidateTable;
use crate::error::RequestError;
use crate::features::{align_features, engineer_features};
use crate::ml::engine::{Prediction, predict_batch};
use crate::ml::registry::Registry;

// ---------------------------------------------------------------------------
// Result decoding
// ---------------------------------------------------------------------------

/// Semantic class of a prediction code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    FalsePositive,
    Candidate,
    Confirmed,
    Unknown,
}

impl Disposition {
    /// Decode a raw class code.  Codes outside the trained enumeration map
    /// to [`Disposition::Unknown`] rather than failing.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Disposition::FalsePositive,
            1 => Disposition::Candidate,
            2 => Disposition::Confirmed,
            _ => Disposition::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Disposition::FalsePositive => "FALSE POSITIVE",
            Disposition::Candidate => "CANDIDATE",
            Disposition::Confirmed => "CONFIRMED",
            Disposition::Unknown => "UNKNOWN",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Disposition::FalsePositive => "❌",
            Disposition::Candidate => "🔍",
            Disposition::Confirmed => "🌍",
            Disposition::Unknown => "❓",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Disposition::FalsePositive => "#ff4444",
            Disposition::Candidate => "#ffa500",
            Disposition::Confirmed => "#44ff44",
            Disposition::Unknown => "#888888",
        }
    }
}

/// Per-class probabilities, named by the same enumeration the class codes
/// use (index 0 → false positive, 1 → candidate, 2 → confirmed).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassProbabilities {
    pub false_positive: f64,
    pub candidate: f64,
    pub confirmed: f64,
}

/// One decoded row of the prediction report.
#[derive(Debug, Clone, Serialize)]
pub struct DecodedPrediction {
    /// 1-based row number of the input table.
    pub row: usize,
    pub label: &'static str,
    pub icon: &'static str,
    pub color: &'static str,
    pub code: i64,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<ClassProbabilities>,
}

/// Map raw predictions to decoded report rows.
pub fn decode_predictions(predictions: &[Prediction]) -> Vec<DecodedPrediction> {
    predictions
        .iter()
        .enumerate()
        .map(|(i, pred)| {
            let disposition = Disposition::from_code(pred.class_code);
            DecodedPrediction {
                row: i + 1,
                label: disposition.label(),
                icon: disposition.icon(),
                color: disposition.color(),
                code: pred.class_code,
                confidence: pred.confidence,
                probabilities: pred.probabilities.map(|p| ClassProbabilities {
                    false_positive: p[0],
                    candidate: p[1],
                    confirmed: p[2],
                }),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Distribution of a decoded batch across the three classes.
#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    pub total: usize,
    pub false_positive_count: usize,
    pub candidate_count: usize,
    pub confirmed_count: usize,
    pub false_positive_percentage: f64,
    pub candidate_percentage: f64,
    pub confirmed_percentage: f64,
}

impl Statistics {
    /// Aggregate a decoded batch.  Callers must pass a non-empty batch;
    /// an empty one is a precondition violation, not a zero result.
    pub fn compute(results: &[DecodedPrediction]) -> Result<Statistics, RequestError> {
        if results.is_empty() {
            return Err(RequestError::EmptyBatch);
        }

        let count_of = |code: i64| results.iter().filter(|r| r.code == code).count();
        let false_positive_count = count_of(0);
        let candidate_count = count_of(1);
        let confirmed_count = count_of(2);

        let total = results.len();
        let pct = |count: usize| (count as f64 / total as f64) * 100.0;

        Ok(Statistics {
            total,
            false_positive_count,
            candidate_count,
            confirmed_count,
            false_positive_percentage: pct(false_positive_count),
            candidate_percentage: pct(candidate_count),
            confirmed_percentage: pct(confirmed_count),
        })
    }
}

// ---------------------------------------------------------------------------
// Request pipeline
// ---------------------------------------------------------------------------

/// The full report for one prediction request.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub model: String,
    pub rows_processed: usize,
    pub features_used: usize,
    pub predictions: Vec<DecodedPrediction>,
    pub statistics: Statistics,
    pub summary: String,
}

/// Run one prediction request end-to-end: engineer, align, predict,
/// decode, aggregate.
pub fn run_request(
    registry: &Registry,
    model_name: &str,
    table: &CandidateTable,
) -> Result<BatchReport, RequestError> {
    if table.is_empty() {
        return Err(RequestError::EmptyDataset);
    }

    let entry = registry.get(model_name)?;

    let engineered = engineer_features(table);
    let rows = align_features(&engineered, registry.feature_names());
    let features_used = rows.first().map_or(0, Vec::len);

    log::info!(
        "Predicting {} rows × {} features with '{model_name}'",
        rows.len(),
        features_used
    );

    let predictions = decode_predictions(&predict_batch(&entry.predictor, &rows));
    let statistics = Statistics::compute(&predictions)?;

    let summary = format!(
        "Analysis complete: {} confirmed, {} candidates, {} false positives.",
        statistics.confirmed_count, statistics.candidate_count, statistics.false_positive_count
    );

    Ok(BatchReport {
        model: entry.display_name.clone(),
        rows_processed: table.len(),
        features_used,
        predictions,
        statistics,
        summary,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{CandidateRecord, FieldValue};
    use crate::ml::engine::NEUTRAL_CONFIDENCE;
    use crate::ml::predictor::{ModelArtifact, NUM_CLASSES, ProbabilisticClassifier, Predictor,
        VotingEnsemble};
    use crate::ml::registry::ModelEntry;
    use anyhow::Result;

    #[test]
    fn decoder_is_a_fixed_deterministic_mapping() {
        for _ in 0..2 {
            let d = Disposition::from_code(0);
            assert_eq!((d.label(), d.icon(), d.color()), ("FALSE POSITIVE", "❌", "#ff4444"));
            let d = Disposition::from_code(1);
            assert_eq!((d.label(), d.icon(), d.color()), ("CANDIDATE", "🔍", "#ffa500"));
            let d = Disposition::from_code(2);
            assert_eq!((d.label(), d.icon(), d.color()), ("CONFIRMED", "🌍", "#44ff44"));
        }
    }

    #[test]
    fn unrecognized_codes_decode_to_unknown() {
        for code in [-1, 3, 42, i64::MAX] {
            let d = Disposition::from_code(code);
            assert_eq!(d, Disposition::Unknown);
            assert_eq!((d.label(), d.icon(), d.color()), ("UNKNOWN", "❓", "#888888"));
        }
    }

    #[test]
    fn probabilities_carry_through_positionally() {
        let decoded = decode_predictions(&[Prediction {
            class_code: 2,
            probabilities: Some([0.05, 0.05, 0.9]),
            confidence: 0.9,
        }]);
        let probs = decoded[0].probabilities.unwrap();
        assert_eq!(probs.false_positive, 0.05);
        assert_eq!(probs.candidate, 0.05);
        assert_eq!(probs.confirmed, 0.9);
        assert_eq!(decoded[0].row, 1);
    }

    #[test]
    fn statistics_reject_empty_batches() {
        assert!(matches!(
            Statistics::compute(&[]),
            Err(RequestError::EmptyBatch)
        ));
    }

    #[test]
    fn statistics_percentages_sum_to_one_hundred() {
        let decoded = decode_predictions(&[
            Prediction { class_code: 0, probabilities: None, confidence: 0.5 },
            Prediction { class_code: 1, probabilities: None, confidence: 0.5 },
            Prediction { class_code: 1, probabilities: None, confidence: 0.5 },
            Prediction { class_code: 2, probabilities: None, confidence: 0.5 },
            Prediction { class_code: 2, probabilities: None, confidence: 0.5 },
        ]);
        let stats = Statistics::compute(&decoded).unwrap();
        let count_sum =
            stats.false_positive_count + stats.candidate_count + stats.confirmed_count;
        assert_eq!(count_sum, stats.total);
        let pct_sum = stats.false_positive_percentage
            + stats.candidate_percentage
            + stats.confirmed_percentage;
        assert!((pct_sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn statistics_count_unknown_codes_in_total_only() {
        let decoded = decode_predictions(&[
            Prediction { class_code: 0, probabilities: None, confidence: 0.5 },
            Prediction { class_code: 2, probabilities: None, confidence: 0.5 },
            Prediction { class_code: 7, probabilities: None, confidence: 0.5 },
        ]);
        let stats = Statistics::compute(&decoded).unwrap();
        assert_eq!(stats.total, 3);
        let pct_sum = stats.false_positive_percentage
            + stats.candidate_percentage
            + stats.confirmed_percentage;
        assert!((pct_sum - 200.0 / 3.0).abs() < 1e-9);
    }

    // -- end-to-end scenario --

    struct ScriptedModel(Vec<[f64; NUM_CLASSES]>);

    impl ProbabilisticClassifier for ScriptedModel {
        fn predict_probabilities(&self, _rows: &[Vec<f64>]) -> Result<Vec<[f64; NUM_CLASSES]>> {
            Ok(self.0.clone())
        }
    }

    fn four_row_table() -> CandidateTable {
        let records = (0..4)
            .map(|i| CandidateRecord {
                fields: [
                    ("period".to_string(), FieldValue::Float(10.0 + i as f64)),
                    ("depth".to_string(), FieldValue::Float(300.0)),
                ]
                .into_iter()
                .collect(),
            })
            .collect();
        CandidateTable::from_records(records)
    }

    #[test]
    fn scripted_batch_matches_expected_statistics() {
        let model = ScriptedModel(vec![
            [0.9, 0.05, 0.05],
            [0.1, 0.6, 0.3],
            [0.2, 0.5, 0.3],
            [0.05, 0.05, 0.9],
        ]);
        let registry = Registry::from_models([(
            "a".to_string(),
            ModelEntry {
                display_name: "Model A".to_string(),
                predictor: Predictor::Probabilistic(Box::new(model)),
            },
        )]);

        let report = run_request(&registry, "a", &four_row_table()).unwrap();

        assert_eq!(report.model, "Model A");
        assert_eq!(report.rows_processed, 4);
        assert_eq!(report.features_used, 15);
        assert_eq!(
            report.predictions.iter().map(|p| p.code).collect::<Vec<_>>(),
            vec![0, 1, 1, 2]
        );

        let stats = &report.statistics;
        assert_eq!(stats.total, 4);
        assert_eq!(stats.false_positive_count, 1);
        assert_eq!(stats.candidate_count, 2);
        assert_eq!(stats.confirmed_count, 1);
        assert!((stats.false_positive_percentage - 25.0).abs() < 1e-9);
        assert!((stats.candidate_percentage - 50.0).abs() < 1e-9);
        assert!((stats.confirmed_percentage - 25.0).abs() < 1e-9);
    }

    #[test]
    fn empty_feature_contract_still_predicts_via_fallback_alignment() {
        let model = ScriptedModel(vec![[0.1, 0.8, 0.1]]);
        let registry = Registry::from_models([(
            "a".to_string(),
            ModelEntry {
                display_name: "Model A".to_string(),
                predictor: Predictor::Probabilistic(Box::new(model)),
            },
        )])
        .with_feature_names(Vec::new());

        let records = vec![CandidateRecord {
            fields: [
                ("a".to_string(), FieldValue::Integer(1)),
                ("b".to_string(), FieldValue::Integer(2)),
            ]
            .into_iter()
            .collect(),
        }];
        let table = CandidateTable::from_records(records);

        let report = run_request(&registry, "a", &table).unwrap();
        assert_eq!(report.features_used, 2);
        assert_eq!(report.predictions[0].code, 1);
    }

    #[test]
    fn empty_table_is_rejected_before_prediction() {
        let registry = Registry::from_models([]);
        let table = CandidateTable::from_records(vec![]);
        assert!(matches!(
            run_request(&registry, "a", &table),
            Err(RequestError::EmptyDataset)
        ));
    }

    #[test]
    fn failing_model_still_produces_a_full_report() {
        // empty voting ensemble errors on predict → engine fallback
        let registry = Registry::from_models([(
            "voting".to_string(),
            ModelEntry {
                display_name: "Voting Ensemble".to_string(),
                predictor: ModelArtifact::VotingEnsemble(VotingEnsemble { members: vec![] })
                    .into_predictor(),
            },
        )]);

        let report = run_request(&registry, "voting", &four_row_table()).unwrap();
        assert_eq!(report.statistics.candidate_count, 4);
        for p in &report.predictions {
            assert_eq!(p.code, 1);
            assert_eq!(p.confidence, NEUTRAL_CONFIDENCE);
            assert!(p.probabilities.is_none());
        }
    }
}
