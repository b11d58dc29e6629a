use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};

use super::predictor::{ArtifactFile, Predictor};
use crate::error::RequestError;

// ---------------------------------------------------------------------------
// Feature contract
// ---------------------------------------------------------------------------

/// The ordered feature contract shared by every registered model.  All
/// models are trained on this exact vector; it is registry-wide, not
/// per-model.
pub const FEATURE_NAMES: [&str; 15] = [
    "period",
    "planet_radius",
    "depth",
    "equilibrium_temp",
    "insolation",
    "impact",
    "duration",
    "star_radius",
    "star_mass",
    "star_teff",
    "kepmag",
    "planet_density_ratio",
    "log_period",
    "stellar_flux",
    "temp_ratio",
];

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// One loaded model: display metadata plus the predictor itself.
pub struct ModelEntry {
    pub display_name: String,
    pub predictor: Predictor,
}

/// Named predictors loaded once at startup, immutable afterward.
///
/// The registry is constructed before any request is served and shared by
/// reference; predictors are `Send + Sync`, so concurrent readers need no
/// locking.
pub struct Registry {
    models: BTreeMap<String, ModelEntry>,
    feature_names: Vec<String>,
}

impl Registry {
    /// Build a registry directly from loaded models (bypasses the
    /// filesystem; the standard feature contract applies).
    pub fn from_models(models: impl IntoIterator<Item = (String, ModelEntry)>) -> Self {
        Registry {
            models: models.into_iter().collect(),
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Replace the feature contract.  An empty contract switches the
    /// aligner to its numeric-columns fallback.
    pub fn with_feature_names(mut self, feature_names: Vec<String>) -> Self {
        self.feature_names = feature_names;
        self
    }

    /// Load every `*.json` model artifact in `dir`.
    ///
    /// An artifact that fails to read or parse is logged and skipped; the
    /// registry still constructs.  Requests against an empty registry are
    /// rejected with [`RequestError::RegistryNotReady`] at selection time.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        log::info!("Loading model artifacts from {}", dir.display());

        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("reading model directory {}", dir.display()))?;

        let mut models = BTreeMap::new();
        for entry in entries {
            let path = entry.context("reading model directory entry")?.path();
            let is_json = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("json"));
            if !is_json {
                continue;
            }
            match load_artifact(&path) {
                Ok((name, entry)) => {
                    log::info!("Loaded model '{name}' from {}", path.display());
                    models.insert(name, entry);
                }
                Err(err) => {
                    log::warn!("Skipping model artifact {}: {err:#}", path.display());
                }
            }
        }

        if models.is_empty() {
            log::warn!("No loadable model artifacts in {}", dir.display());
        } else {
            log::info!(
                "Models loaded: [{}], features: {}",
                models.keys().cloned().collect::<Vec<_>>().join(", "),
                FEATURE_NAMES.len()
            );
        }

        Ok(Registry::from_models(models))
    }

    /// Whether at least one model is available for prediction.
    pub fn is_ready(&self) -> bool {
        !self.models.is_empty()
    }

    /// The feature contract, in declared order.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Selection tokens of all loaded models, sorted.
    pub fn model_names(&self) -> Vec<&str> {
        self.models.keys().map(String::as_str).collect()
    }

    /// Resolve a selection token to a loaded model.
    pub fn get(&self, name: &str) -> Result<&ModelEntry, RequestError> {
        if self.models.is_empty() {
            return Err(RequestError::RegistryNotReady);
        }
        self.models
            .get(name)
            .ok_or_else(|| RequestError::UnknownModel(name.to_string()))
    }
}

fn load_artifact(path: &Path) -> Result<(String, ModelEntry)> {
    let text = std::fs::read_to_string(path).context("reading artifact")?;
    let artifact: ArtifactFile = serde_json::from_str(&text).context("parsing artifact JSON")?;

    let display_name = artifact
        .display_name
        .clone()
        .unwrap_or_else(|| artifact.name.clone());
    let entry = ModelEntry {
        display_name,
        predictor: artifact.model.into_predictor(),
    };
    Ok((artifact.name, entry))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
