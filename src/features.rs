use crate::data::model::{CandidateRecord, CandidateTable};

// ---------------------------------------------------------------------------
// Feature engineering
// ---------------------------------------------------------------------------

/// Guard against division by zero in ratio features.
const EPSILON: f64 = 1e-6;

/// Derive secondary features on every record of the table.
///
/// Each rule fires independently and only when all of its source columns
/// are present and numeric; otherwise the derived column is simply absent
/// downstream (the aligner fills it with the default).  Original columns
/// are never modified.
///
/// Derived columns:
/// * `planet_density_ratio` = planet_radius / (star_radius + ε)
/// * `log_period`           = ln(1 + period)
/// * `stellar_flux`         = insolation / (star_radius² + ε)
/// * `temp_ratio`           = equilibrium_temp / (star_teff + ε)
pub fn engineer_features(table: &CandidateTable) -> CandidateTable {
    let records = table
        .records
        .iter()
        .map(|rec| {
            let mut rec = rec.clone();
            engineer_record(&mut rec);
            rec
        })
        .collect();
    CandidateTable::from_records(records)
}

fn engineer_record(rec: &mut CandidateRecord) {
    if let (Some(planet_radius), Some(star_radius)) =
        (rec.numeric("planet_radius"), rec.numeric("star_radius"))
    {
        rec.insert_derived(
            "planet_density_ratio",
            planet_radius / (star_radius + EPSILON),
        );
    }

    if let Some(period) = rec.numeric("period") {
        rec.insert_derived("log_period", period.ln_1p());
    }

    if let (Some(insolation), Some(star_radius)) =
        (rec.numeric("insolation"), rec.numeric("star_radius"))
    {
        rec.insert_derived(
            "stellar_flux",
            insolation / (star_radius.powi(2) + EPSILON),
        );
    }

    if let (Some(equilibrium_temp), Some(star_teff)) =
        (rec.numeric("equilibrium_temp"), rec.numeric("star_teff"))
    {
        rec.insert_derived("temp_ratio", equilibrium_temp / (star_teff + EPSILON));
    }
}

// ---------------------------------------------------------------------------
// Feature alignment
// ---------------------------------------------------------------------------

/// Value substituted for declared features the record does not carry.
const MISSING_FEATURE_FILL: f64 = 0.0;

/// Align every record against the model's declared feature contract.
///
/// Each output row has exactly `feature_names.len()` values in declared
/// order, regardless of which columns the input happened to carry.
/// Missing or non-numeric cells become [`MISSING_FEATURE_FILL`].
///
/// When `feature_names` is empty (degenerate registry), falls back to all
/// numeric columns of each record in stable sorted-by-name order.  The
/// fallback never fails; fully non-numeric input yields zero-width rows.
pub fn align_features(table: &CandidateTable, feature_names: &[String]) -> Vec<Vec<f64>> {
    table
        .records
        .iter()
        .map(|rec| {
            if feature_names.is_empty() {
                numeric_columns(rec)
            } else {
                feature_names
                    .iter()
                    .map(|name| rec.numeric(name).unwrap_or(MISSING_FEATURE_FILL))
                    .collect()
            }
        })
        .collect()
}

/// All numeric cells of a record, sorted by column name.
fn numeric_columns(rec: &CandidateRecord) -> Vec<f64> {
    // BTreeMap iteration is already sorted by key.
    rec.fields
        .values()
        .filter_map(|v| v.as_f64())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
