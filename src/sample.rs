//! Seeded synthetic datasets.
//!
//! Produces raw node and edge tables in the same shape the upstream topic
//! pipeline writes (quarter labels, `cluster_name`, `scaled_size`, explicit
//! edge endpoints, free-text columns), so demos and tests go through the
//! full normalization path. The same seed always yields the same tables.

use crate::colors::known_clusters;
use crate::records::RawRow;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::f64::consts::TAU;

const THEMES: &[&str] = &[
    "breath counting",
    "body scan",
    "noting practice",
    "loving kindness",
    "sleep and rest",
    "retreat logistics",
    "dharma lineages",
    "work stress",
    "restlessness",
    "daily habit",
];

const EMOTIONS: &[&str] = &[
    "joy", "curiosity", "calm", "gratitude", "frustration", "doubt", "relief", "awe",
];

/// Size of a generated dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleOptions {
    pub periods: usize,
    pub nodes_per_period: usize,
    pub edges_per_period: usize,
    /// One node in this many has no sentiment value.
    pub missing_sentiment_every: usize,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            periods: 6,
            nodes_per_period: 40,
            edges_per_period: 30,
            missing_sentiment_every: 17,
        }
    }
}

/// Raw node and edge tables.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SampleTables {
    pub nodes: Vec<RawRow>,
    pub edges: Vec<RawRow>,
}

/// Quarter label for the i-th generated period, starting at 2023Q1.
pub fn quarter(index: usize) -> String {
    format!("{}Q{}", 2023 + index / 4, index % 4 + 1)
}

/// Generate tables for `options` from `seed`.
pub fn generate(seed: u64, options: &SampleOptions) -> SampleTables {
    let mut rng = StdRng::seed_from_u64(seed);
    let clusters: Vec<&str> = known_clusters().collect();
    let mut tables = SampleTables::default();

    for p in 0..options.periods {
        let period = quarter(p);
        let mut positions: Vec<(String, f64, f64)> = Vec::with_capacity(options.nodes_per_period);

        for i in 0..options.nodes_per_period {
            let k = rng.gen_range(0..clusters.len());
            let angle = k as f64 * TAU / clusters.len() as f64;
            let x = round3(angle.cos() + rng.gen_range(-0.35..0.35));
            let y = round3(angle.sin() + rng.gen_range(-0.35..0.35));
            let id = format!("{}-{}", period, i);

            let sentiment = if options.missing_sentiment_every > 0
                && (p * options.nodes_per_period + i) % options.missing_sentiment_every == 0
            {
                Value::Null
            } else {
                json!(round2(rng.gen_range(-1.0..1.0)))
            };

            let emotions: Vec<&str> = EMOTIONS.choose_multiple(&mut rng, 3).copied().collect();

            let mut row = RawRow::new();
            row.insert("id".into(), json!(id));
            row.insert("quarter".into(), json!(period));
            row.insert("x".into(), json!(x));
            row.insert("y".into(), json!(y));
            row.insert("cluster_name".into(), json!(clusters[k]));
            row.insert("sentiment".into(), sentiment);
            row.insert("scaled_size".into(), json!(round2(rng.gen_range(4.0..24.0))));
            row.insert("theme".into(), json!(THEMES[rng.gen_range(0..THEMES.len())]));
            row.insert("Top Emotions".into(), json!(emotions.join(", ")));
            row.insert("Post/Comment".into(), json!(if rng.gen_bool(0.6) { "Post" } else { "Comment" }));
            row.insert("avg_score".into(), json!([rng.gen_range(1..400)]));
            tables.nodes.push(row);

            positions.push((id, x, y));
        }

        if positions.len() < 2 {
            continue;
        }
        for _ in 0..options.edges_per_period {
            let a = rng.gen_range(0..positions.len());
            let mut b = rng.gen_range(0..positions.len() - 1);
            if b >= a {
                b += 1;
            }
            let (source, x0, y0) = &positions[a];
            let (target, x1, y1) = &positions[b];

            let mut row = RawRow::new();
            row.insert("source".into(), json!(source));
            row.insert("target".into(), json!(target));
            row.insert("quarter".into(), json!(period));
            row.insert("x0".into(), json!(x0));
            row.insert("y0".into(), json!(y0));
            row.insert("x1".into(), json!(x1));
            row.insert("y1".into(), json!(y1));
            row.insert("weight".into(), json!(rng.gen_range(1..60)));
            row.insert("sentiment".into(), json!(round2(rng.gen_range(-1.0..1.0))));
            row.insert("theme_1".into(), json!(THEMES[rng.gen_range(0..THEMES.len())]));
            row.insert("theme_2".into(), json!(THEMES[rng.gen_range(0..THEMES.len())]));
            tables.edges.push(row);
        }
    }

    tracing::debug!(
        seed,
        nodes = tables.nodes.len(),
        edges = tables.edges.len(),
        "generated sample tables"
    );
    tables
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}
