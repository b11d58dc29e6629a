use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// The three dispositions every classifier is trained on.
pub const NUM_CLASSES: usize = 3;

// ---------------------------------------------------------------------------
// Predictor – capability-split classifier interface
// ---------------------------------------------------------------------------

/// A classifier that produces class codes only.
pub trait PointClassifier: Send + Sync {
    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<i64>>;
}

/// A classifier that produces a full per-class probability row per record.
/// Class codes are derived by argmax over the probabilities.
pub trait ProbabilisticClassifier: Send + Sync {
    fn predict_probabilities(&self, rows: &[Vec<f64>]) -> Result<Vec<[f64; NUM_CLASSES]>>;
}

/// A loaded predictor, split by capability.  The prediction engine
/// dispatches on the variant; there is no runtime capability probing.
pub enum Predictor {
    /// Point predictions only (no probability output).
    Point(Box<dyn PointClassifier>),
    /// Point predictions plus per-class probabilities.
    Probabilistic(Box<dyn ProbabilisticClassifier>),
}

/// Index of the largest probability; first index wins ties.
pub fn argmax(probs: &[f64; NUM_CLASSES]) -> usize {
    let mut best = 0;
    for (i, p) in probs.iter().enumerate().skip(1) {
        if *p > probs[best] {
            best = i;
        }
    }
    best
}

// ---------------------------------------------------------------------------
// Regression trees
// ---------------------------------------------------------------------------

/// One node of a regression tree, stored in a flat array (root at 0).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// A single regression tree over an aligned feature row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    /// Walk the tree for one feature row.  Rows shorter than a referenced
    /// feature index, or dangling child indices, are malformed artifacts.
    fn score(&self, row: &[f64]) -> Result<f64> {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx) {
                Some(Node::Leaf { value }) => return Ok(*value),
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let Some(value) = row.get(*feature) else {
                        bail!(
                            "feature index {feature} out of range for row of width {}",
                            row.len()
                        );
                    };
                    idx = if *value < *threshold { *left } else { *right };
                }
                None => bail!("dangling node index {idx} in tree"),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Gradient-boosted tree ensemble (probabilistic)
// ---------------------------------------------------------------------------

/// Per-class boosted regression trees.  Class scores are the base score
/// plus the sum of that class's trees; probabilities come from a softmax
/// over the three scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeEnsemble {
    #[serde(default)]
    pub base_score: f64,
    /// Outer index = class code (0/1/2), inner = boosting rounds.
    pub trees: [Vec<Tree>; NUM_CLASSES],
}

impl TreeEnsemble {
    fn class_scores(&self, row: &[f64]) -> Result<[f64; NUM_CLASSES]> {
        let mut scores = [self.base_score; NUM_CLASSES];
        for (class, rounds) in self.trees.iter().enumerate() {
            for tree in rounds {
                scores[class] += tree.score(row)?;
            }
        }
        Ok(scores)
    }
}

impl ProbabilisticClassifier for TreeEnsemble {
    fn predict_probabilities(&self, rows: &[Vec<f64>]) -> Result<Vec<[f64; NUM_CLASSES]>> {
        rows.iter()
            .map(|row| self.class_scores(row).map(softmax))
            .collect()
    }
}

fn softmax(scores: [f64; NUM_CLASSES]) -> [f64; NUM_CLASSES] {
    let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exp = scores.map(|s| (s - max).exp());
    let sum: f64 = exp.iter().sum();
    exp.map(|e| e / sum)
}

// ---------------------------------------------------------------------------
// Hard-voting ensemble (point-only)
// ---------------------------------------------------------------------------

/// Majority vote over member tree ensembles.  Hard voting discards the
/// members' probabilities, so this predictor exposes class codes only.
/// Ties break toward the lowest class code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VotingEnsemble {
    pub members: Vec<TreeEnsemble>,
}

impl PointClassifier for VotingEnsemble {
    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<i64>> {
        if self.members.is_empty() {
            bail!("voting ensemble has no members");
        }
        rows.iter()
            .map(|row| {
                let mut votes = [0u32; NUM_CLASSES];
                for member in &self.members {
                    let scores = member.class_scores(row)?;
                    votes[argmax(&softmax(scores))] += 1;
                }
                let winner = votes
                    .iter()
                    .enumerate()
                    .max_by(|(ia, a), (ib, b)| a.cmp(b).then(ib.cmp(ia)))
                    .map(|(i, _)| i as i64)
                    .unwrap_or(0);
                Ok(winner)
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Persisted artifact schema
// ---------------------------------------------------------------------------

/// The model payload of a persisted artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    GradientBoostedTrees(TreeEnsemble),
    VotingEnsemble(VotingEnsemble),
}

impl ModelArtifact {
    /// Wrap the deserialized model in its capability variant.
    pub fn into_predictor(self) -> Predictor {
        match self {
            ModelArtifact::GradientBoostedTrees(model) => {
                Predictor::Probabilistic(Box::new(model))
            }
            ModelArtifact::VotingEnsemble(model) => Predictor::Point(Box::new(model)),
        }
    }
}

/// One model artifact file: selection token, display metadata, model payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactFile {
    /// Selection token used by prediction requests.
    pub name: String,
    /// Human-readable name for reports; defaults to `name`.
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(flatten)]
    pub model: ModelArtifact,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(feature: usize, threshold: f64, low: f64, high: f64) -> Tree {
        Tree {
            nodes: vec![
                Node::Split {
                    feature,
                    threshold,
                    left: 1,
                    right: 2,
                },
                Node::Leaf { value: low },
                Node::Leaf { value: high },
            ],
        }
    }

    /// Ensemble that scores class `class` high when feature 0 >= 1.0.
    fn biased_ensemble(class: usize) -> TreeEnsemble {
        let mut trees: [Vec<Tree>; NUM_CLASSES] = Default::default();
        trees[class].push(stump(0, 1.0, -2.0, 2.0));
        TreeEnsemble {
            base_score: 0.0,
            trees,
        }
    }

    #[test]
    fn tree_routes_left_below_threshold() {
        let tree = stump(0, 5.0, -1.0, 1.0);
        assert_eq!(tree.score(&[4.9]).unwrap(), -1.0);
        assert_eq!(tree.score(&[5.0]).unwrap(), 1.0);
    }

    #[test]
    fn tree_rejects_feature_index_beyond_row() {
        let tree = stump(3, 5.0, -1.0, 1.0);
        assert!(tree.score(&[1.0, 2.0]).is_err());
    }

    #[test]
    fn probabilities_sum_to_one_and_argmax_tracks_scores() {
        let model = biased_ensemble(2);
        let probs = model.predict_probabilities(&[vec![3.0]]).unwrap();
        let row = probs[0];
        let sum: f64 = row.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert_eq!(argmax(&row), 2);
        assert!(row[2] > row[0]);
    }

    #[test]
    fn argmax_first_index_wins_ties() {
        assert_eq!(argmax(&[0.4, 0.4, 0.2]), 0);
        assert_eq!(argmax(&[0.1, 0.2, 0.7]), 2);
    }

    #[test]
    fn voting_majority_wins() {
        let ensemble = VotingEnsemble {
            members: vec![biased_ensemble(2), biased_ensemble(2), biased_ensemble(0)],
        };
        let codes = ensemble.predict(&[vec![3.0]]).unwrap();
        assert_eq!(codes, vec![2]);
    }

    #[test]
    fn voting_tie_breaks_toward_lowest_code() {
        let ensemble = VotingEnsemble {
            members: vec![biased_ensemble(2), biased_ensemble(1)],
        };
        let codes = ensemble.predict(&[vec![3.0]]).unwrap();
        assert_eq!(codes, vec![1]);
    }

    #[test]
    fn empty_voting_ensemble_is_an_error() {
        let ensemble = VotingEnsemble { members: vec![] };
        assert!(ensemble.predict(&[vec![1.0]]).is_err());
    }

    #[test]
    fn artifact_json_selects_capability_variant() {
        let json = r#"{
            "name": "gbdt",
            "display_name": "Gradient Boosted Trees",
            "kind": "gradient_boosted_trees",
            "base_score": 0.1,
            "trees": [
                [{"nodes": [{"type": "leaf", "value": 0.5}]}],
                [],
                []
            ]
        }"#;
        let artifact: ArtifactFile = serde_json::from_str(json).unwrap();
        assert_eq!(artifact.name, "gbdt");
        assert!(matches!(
            artifact.model,
            ModelArtifact::GradientBoostedTrees(_)
        ));
        assert!(matches!(
            artifact.model.into_predictor(),
            Predictor::Probabilistic(_)
        ));

        let json = r#"{
            "name": "voting",
            "kind": "voting_ensemble",
            "members": []
        }"#;
        let artifact: ArtifactFile = serde_json::from_str(json).unwrap();
        assert!(matches!(
            artifact.model.into_predictor(),
            Predictor::Point(_)
        ));
    }
}
