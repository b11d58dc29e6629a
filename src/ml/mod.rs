/// Model layer: loaded predictors and the prediction engine.
///
/// Architecture:
/// ```text
///   models/*.json
///        │
///        ▼
///   ┌──────────┐
///   │ registry  │  named, immutable ModelEntry map + feature contract
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  engine   │  capability dispatch → normalized Predictions
///   └──────────┘
/// ```

pub mod engine;
pub mod predictor;
pub mod registry;
