mod data;
mod error;
mod features;
mod ml;
mod report;

use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::error::RequestError;
use crate::ml::registry::Registry;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (models_dir, dataset, selected) = match args.as_slice() {
        [models_dir, dataset] => (models_dir, dataset, None),
        [models_dir, dataset, model] => (models_dir, dataset, Some(model.clone())),
        _ => bail!("usage: exotriage <models-dir> <dataset.{{csv,json,parquet}}> [model-name]"),
    };

    let registry = Registry::load_dir(Path::new(models_dir))?;
    if registry.is_ready() {
        log::info!("Available models: {}", registry.model_names().join(", "));
    }

    // Default to the first registered model when none is named.
    let model_name = selected
        .or_else(|| registry.model_names().first().map(|s| s.to_string()))
        .unwrap_or_default();

    let table = data::loader::load_file(Path::new(dataset))
        .map_err(|e| RequestError::InvalidDataset(format!("{e:#}")))?;
    log::info!(
        "Processing {dataset}: {} rows, {} columns",
        table.len(),
        table.column_names.len()
    );

    let report = report::run_request(&registry, &model_name, &table)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("serializing report")?
    );

    Ok(())
}
