use super::predictor::{NUM_CLASSES, Predictor, argmax};

// ---------------------------------------------------------------------------
// Prediction engine
// ---------------------------------------------------------------------------

/// Confidence assigned when a model exposes no probability output.
pub const NEUTRAL_CONFIDENCE: f64 = 0.5;

/// Class code every record degrades to when a model invocation fails.
pub const FALLBACK_CLASS: i64 = 1;

/// One record's normalized prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub class_code: i64,
    /// Present only for probabilistic predictors.
    pub probabilities: Option<[f64; NUM_CLASSES]>,
    /// Max class probability, or [`NEUTRAL_CONFIDENCE`] without probabilities.
    pub confidence: f64,
}

/// Run one model over an aligned batch and normalize its output.
///
/// Dispatches on the predictor's capability variant.  A failed invocation
/// is absorbed: every record degrades to [`FALLBACK_CLASS`] with neutral
/// confidence and no probabilities, and the failure is logged.  A
/// well-formed request therefore always yields a prediction per row.
pub fn predict_batch(predictor: &Predictor, rows: &[Vec<f64>]) -> Vec<Prediction> {
    let outcome = match predictor {
        Predictor::Probabilistic(model) => model.predict_probabilities(rows).map(|probs| {
            probs
                .into_iter()
                .map(|p| Prediction {
                    class_code: argmax(&p) as i64,
                    confidence: p[argmax(&p)],
                    probabilities: Some(p),
                })
                .collect()
        }),
        Predictor::Point(model) => model.predict(rows).map(|codes| {
            codes
                .into_iter()
                .map(|class_code| Prediction {
                    class_code,
                    probabilities: None,
                    confidence: NEUTRAL_CONFIDENCE,
                })
                .collect()
        }),
    };

    match outcome {
        Ok(predictions) => predictions,
        Err(err) => {
            log::error!("Prediction failed, defaulting batch to candidate: {err:#}");
            rows.iter()
                .map(|_| Prediction {
                    class_code: FALLBACK_CLASS,
                    probabilities: None,
                    confidence: NEUTRAL_CONFIDENCE,
                })
                .collect()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::predictor::{PointClassifier, ProbabilisticClassifier};
    use anyhow::{Result, bail};

    struct FixedProbabilities(Vec<[f64; NUM_CLASSES]>);

    impl ProbabilisticClassifier for FixedProbabilities {
        fn predict_probabilities(&self, _rows: &[Vec<f64>]) -> Result<Vec<[f64; NUM_CLASSES]>> {
            Ok(self.0.clone())
        }
    }

    struct FixedCodes(Vec<i64>);

    impl PointClassifier for FixedCodes {
        fn predict(&self, _rows: &[Vec<f64>]) -> Result<Vec<i64>> {
            Ok(self.0.clone())
        }
    }

    struct AlwaysFails;

    impl PointClassifier for AlwaysFails {
        fn predict(&self, _rows: &[Vec<f64>]) -> Result<Vec<i64>> {
            bail!("internal model failure")
        }
    }

    #[test]
    fn probabilistic_path_derives_code_and_confidence() {
        let predictor = Predictor::Probabilistic(Box::new(FixedProbabilities(vec![
            [0.9, 0.05, 0.05],
            [0.1, 0.6, 0.3],
        ])));
        let out = predict_batch(&predictor, &[vec![0.0], vec![0.0]]);
        assert_eq!(out[0].class_code, 0);
        assert!((out[0].confidence - 0.9).abs() < 1e-12);
        assert_eq!(out[0].probabilities, Some([0.9, 0.05, 0.05]));
        assert_eq!(out[1].class_code, 1);
        assert!((out[1].confidence - 0.6).abs() < 1e-12);
    }

    #[test]
    fn point_only_path_gets_neutral_confidence_and_no_probabilities() {
        let predictor = Predictor::Point(Box::new(FixedCodes(vec![2, 0, 1])));
        let out = predict_batch(&predictor, &vec![vec![0.0]; 3]);
        assert_eq!(
            out.iter().map(|p| p.class_code).collect::<Vec<_>>(),
            vec![2, 0, 1]
        );
        for p in &out {
            assert_eq!(p.confidence, NEUTRAL_CONFIDENCE);
            assert!(p.probabilities.is_none());
        }
    }

    #[test]
    fn failing_model_degrades_every_record_to_candidate() {
        let predictor = Predictor::Point(Box::new(AlwaysFails));
        let out = predict_batch(&predictor, &[vec![1.0], vec![2.0], vec![3.0], vec![4.0]]);
        assert_eq!(out.len(), 4);
        for p in &out {
            assert_eq!(p.class_code, FALLBACK_CLASS);
            assert_eq!(p.confidence, NEUTRAL_CONFIDENCE);
            assert!(p.probabilities.is_none());
        }
    }

    #[test]
    fn empty_batch_yields_empty_output() {
        let predictor = Predictor::Point(Box::new(FixedCodes(vec![])));
        assert!(predict_batch(&predictor, &[]).is_empty());
    }
}
