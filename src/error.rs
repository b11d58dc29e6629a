use thiserror::Error;

/// Typed rejection conditions for one prediction request.
///
/// Failures with no safe degraded output propagate to the caller as one of
/// these variants; model invocation failures never appear here (the engine
/// absorbs them, see [`crate::ml::engine`]).
#[derive(Debug, Error)]
pub enum RequestError {
    /// The uploaded table could not be interpreted as candidate rows.
    #[error("dataset is malformed: {0}")]
    InvalidDataset(String),

    /// The uploaded table parsed but contains no rows.
    #[error("dataset contains no rows")]
    EmptyDataset,

    /// The selection token does not match any loaded model.
    #[error("model '{0}' is not registered")]
    UnknownModel(String),

    /// No models were loaded at startup; the service cannot predict.
    #[error("no models loaded, registry not ready")]
    RegistryNotReady,

    /// Statistics were requested over an empty result set.
    #[error("cannot aggregate an empty result set")]
    EmptyBatch,
}
