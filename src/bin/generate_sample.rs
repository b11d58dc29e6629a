use std::sync::Arc;

use arrow::array::{Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use serde_json::json;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + self.next_f64() * (hi - lo)
    }
}

/// Parameter ranges for one population of generated candidates:
/// (period, planet_radius, depth, equilibrium_temp, insolation, impact,
///  duration, star_radius, star_mass, star_teff, kepmag)
type Regime = [(f64, f64); 11];

// Transit-like signals around quiet dwarfs.
const PLANET_LIKE: Regime = [
    (2.0, 50.0),
    (0.8, 2.5),
    (200.0, 1500.0),
    (300.0, 1200.0),
    (0.5, 300.0),
    (0.0, 0.6),
    (2.0, 6.0),
    (0.7, 1.3),
    (0.8, 1.2),
    (4800.0, 6200.0),
    (10.0, 15.0),
];

// Shallow, noisy signals that need follow-up.
const AMBIGUOUS: Regime = [
    (0.5, 120.0),
    (0.5, 4.0),
    (50.0, 400.0),
    (200.0, 2000.0),
    (0.1, 800.0),
    (0.3, 0.85),
    (0.5, 8.0),
    (0.5, 2.0),
    (0.5, 1.8),
    (3500.0, 7500.0),
    (12.0, 17.0),
];

// Grazing eclipsing-binary impostors: deep transits, high impact.
const BINARY_LIKE: Regime = [
    (0.3, 15.0),
    (3.0, 15.0),
    (3000.0, 20000.0),
    (1000.0, 3500.0),
    (500.0, 5000.0),
    (0.85, 1.2),
    (1.0, 4.0),
    (0.8, 3.0),
    (0.9, 2.5),
    (5000.0, 9000.0),
    (8.0, 13.0),
];

fn main() {
    let mut rng = SimpleRng::new(42);

    let regimes = [PLANET_LIKE, AMBIGUOUS, BINARY_LIKE];
    let rows_per_regime = 20;

    let mut hosts: Vec<String> = Vec::new();
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); 11];

    let mut row_id = 0;
    for regime in &regimes {
        for _ in 0..rows_per_regime {
            hosts.push(format!("KIC-{:06}", 100_000 + row_id * 37));
            for (col, &(lo, hi)) in columns.iter_mut().zip(regime.iter()) {
                col.push(rng.range(lo, hi));
            }
            row_id += 1;
        }
    }

    // ---- Candidate table (parquet) ----

    let column_names = [
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
    ];

    let mut schema_fields = vec![Field::new("host", DataType::Utf8, false)];
    for name in column_names {
        schema_fields.push(Field::new(name, DataType::Float64, false));
    }
    let schema = Arc::new(Schema::new(schema_fields));

    let host_array = StringArray::from(hosts.iter().map(|s| s.as_str()).collect::<Vec<_>>());
    let mut arrays: Vec<Arc<dyn arrow::array::Array>> = vec![Arc::new(host_array)];
    for col in columns {
        arrays.push(Arc::new(Float64Array::from(col)));
    }

    let batch =
        RecordBatch::try_new(schema.clone(), arrays).expect("Failed to create RecordBatch");

    let output_path = "sample_candidates.parquet";
    let file = std::fs::File::create(output_path).expect("Failed to create output file");
    let mut writer = ArrowWriter::try_new(file, schema, None).expect("Failed to create writer");
    writer.write(&batch).expect("Failed to write batch");
    writer.close().expect("Failed to close writer");

    // ---- Model artifacts ----
    // Feature indices refer to the shared 15-feature contract:
    // 1 planet_radius, 2 depth, 5 impact, 11 planet_density_ratio.

    let gbdt_trees = |impact_cut: f64, depth_cut: f64| {
        json!([
            [
                {"nodes": [
                    {"type": "split", "feature": 5, "threshold": impact_cut, "left": 1, "right": 2},
                    {"type": "leaf", "value": -1.5},
                    {"type": "leaf", "value": 2.0}
                ]}
            ],
            [
                {"nodes": [
                    {"type": "split", "feature": 2, "threshold": depth_cut, "left": 1, "right": 2},
                    {"type": "leaf", "value": 1.0},
                    {"type": "leaf", "value": -0.5}
                ]}
            ],
            [
                {"nodes": [
                    {"type": "split", "feature": 1, "threshold": 2.5, "left": 1, "right": 2},
                    {"type": "leaf", "value": 1.2},
                    {"type": "leaf", "value": -1.0}
                ]},
                {"nodes": [
                    {"type": "split", "feature": 11, "threshold": 1.5, "left": 1, "right": 2},
                    {"type": "leaf", "value": 0.6},
                    {"type": "leaf", "value": -0.4}
                ]}
            ]
        ])
    };

    let gbdt = json!({
        "name": "gbdt",
        "display_name": "Gradient Boosted Trees",
        "kind": "gradient_boosted_trees",
        "base_score": 0.0,
        "trees": gbdt_trees(0.8, 500.0)
    });

    let voting = json!({
        "name": "voting",
        "display_name": "Voting Ensemble",
        "kind": "voting_ensemble",
        "members": [
            {"base_score": 0.0, "trees": gbdt_trees(0.75, 450.0)},
            {"base_score": 0.0, "trees": gbdt_trees(0.8, 500.0)},
            {"base_score": 0.0, "trees": gbdt_trees(0.85, 550.0)}
        ]
    });

    std::fs::create_dir_all("models").expect("Failed to create models dir");
    for (path, artifact) in [("models/gbdt.json", &gbdt), ("models/voting.json", &voting)] {
        let text = serde_json::to_string_pretty(artifact).expect("Failed to serialize artifact");
        std::fs::write(path, text).expect("Failed to write artifact");
        println!("Wrote {path}");
    }

    println!(
        "Wrote {row_id} candidates ({} columns each) to {output_path}",
        column_names.len() + 1
    );
}
