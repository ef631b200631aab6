//! Record normalization.
//!
//! Raw node and edge tables arrive as rows of loosely typed columns (the
//! output of whatever reader loaded them). [`RecordStore::normalize`] makes
//! a single pass over both tables and produces a [`Dataset`] in which every
//! node and edge has every field filled in:
//!
//! - Optional columns (sentiment, weight, cluster, size) get defaults, and
//!   each defaulted column is reported once per table as a
//!   [`Diagnostic::MissingField`].
//! - Rows that cannot be coerced (bad coordinates, no id, no period) are
//!   dropped and reported as [`Diagnostic::MalformedRecord`].
//! - Edges whose endpoints are not nodes of the same period are dropped and
//!   reported as [`Diagnostic::DanglingEdge`].
//! - Periods left without a single usable node get a
//!   [`Diagnostic::EmptySlice`].
//!
//! Nothing in here fails. Consumers always receive a consistent dataset
//! plus the list of what had to be repaired.

use crate::layout::Point;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

/// One raw table row: column name to value, in source column order.
pub type RawRow = serde_json::Map<String, Value>;

/// Cluster label given to nodes that arrive without one.
pub const UNKNOWN_CLUSTER: &str = "Unknown";

const DEFAULT_SENTIMENT: f64 = 0.0;
const DEFAULT_WEIGHT: f64 = 1.0;
const DEFAULT_SIZE: f64 = 1.0;

// Column names, first entry preferred, later entries are accepted aliases.
const COL_ID: &[&str] = &["id"];
const COL_X: &[&str] = &["x"];
const COL_Y: &[&str] = &["y"];
const COL_CLUSTER: &[&str] = &["cluster", "cluster_name"];
const COL_SENTIMENT: &[&str] = &["sentiment"];
const COL_SIZE: &[&str] = &["size", "scaled_size"];
const COL_PERIOD: &[&str] = &["period", "quarter"];
const COL_SOURCE: &[&str] = &["source_id", "source"];
const COL_TARGET: &[&str] = &["target_id", "target"];
const COL_WEIGHT: &[&str] = &["weight"];
const COL_COLOR: &[&str] = &["color"];
const COL_ENDPOINTS: [&str; 4] = ["x0", "y0", "x1", "y1"];

/// An ordered period label such as `2024Q3`.
///
/// Periods compare lexicographically, which is also chronological for the
/// `YYYYQn` labels the upstream pipeline produces.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Period(String);

impl Period {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human-facing label.
    ///
    /// Raw quarter values like `2024-3` or `2024Q3` display as `2024Q3`;
    /// anything else is shown as-is.
    pub fn display_label(&self) -> String {
        let raw = self.0.trim();
        let year = raw.get(..4).filter(|y| y.chars().all(|c| c.is_ascii_digit()));
        let quarter = raw.chars().last().filter(|c| ('1'..='4').contains(c));
        match (year, quarter) {
            (Some(year), Some(quarter)) if raw.len() > 4 => format!("{}Q{}", year, quarter),
            _ => raw.to_string(),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Period {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

/// A named text attribute carried through to hover annotations.
///
/// `value` is `None` when the source cell was null; the hover formatter
/// skips those.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextField {
    pub name: String,
    pub value: Option<String>,
}

impl TextField {
    pub fn new(name: impl Into<String>, value: Option<String>) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// A normalized topic node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique within its period.
    pub id: String,
    /// Raw layout position (render-space after [`crate::layout`]).
    pub position: Point,
    pub cluster: String,
    /// In [-1, 1].
    pub sentiment: f64,
    /// Marker size hint, also the centroid weight for cluster labels.
    pub size: f64,
    pub text_fields: Vec<TextField>,
    pub period: Period,
}

/// A normalized co-occurrence edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source_id: String,
    pub target_id: String,
    /// Source endpoint coordinate.
    pub from: Point,
    /// Target endpoint coordinate.
    pub to: Point,
    /// Non-negative engagement weight.
    pub weight: f64,
    /// In [-1, 1].
    pub sentiment: f64,
    /// Precomputed line color, if the upstream table carried one.
    pub color: Option<String>,
    pub text_fields: Vec<TextField>,
    pub period: Period,
}

/// The nodes and edges of one period.
#[derive(Debug, Clone, PartialEq)]
pub struct Slice {
    pub period: Period,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Slice {
    pub fn empty(period: Period) -> Self {
        Self {
            period,
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Which input table a diagnostic refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Nodes,
    Edges,
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Table::Nodes => f.write_str("nodes"),
            Table::Edges => f.write_str("edges"),
        }
    }
}

/// A recoverable anomaly found while normalizing or slicing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// An optional column was absent in some rows and a default was used.
    MissingField {
        table: Table,
        field: String,
        rows: usize,
        default: String,
    },
    /// A row that could not be coerced and was dropped.
    MalformedRecord {
        table: Table,
        row: usize,
        reason: String,
    },
    /// An edge referring to a node that is not in its period.
    DanglingEdge {
        row: usize,
        period: Period,
        source_id: String,
        target_id: String,
    },
    /// A period without any usable node.
    EmptySlice { period: Period },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MissingField {
                table,
                field,
                rows,
                default,
            } => write!(
                f,
                "{} table: '{}' missing in {} row(s), using {}",
                table, field, rows, default
            ),
            Diagnostic::MalformedRecord { table, row, reason } => {
                write!(f, "{} table: dropped row {} ({})", table, row, reason)
            }
            Diagnostic::DanglingEdge {
                row,
                period,
                source_id,
                target_id,
            } => write!(
                f,
                "edges table: dropped row {} ({} -> {} not both present in {})",
                row, source_id, target_id, period
            ),
            Diagnostic::EmptySlice { period } => write!(f, "period {} has no usable nodes", period),
        }
    }
}

/// Accumulated diagnostics plus drop counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub entries: Vec<Diagnostic>,
    pub dropped_nodes: usize,
    pub dropped_edges: usize,
}

impl Diagnostics {
    /// Record a diagnostic and log it.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::warn!("{}", diagnostic);
        match &diagnostic {
            Diagnostic::MalformedRecord {
                table: Table::Nodes,
                ..
            } => self.dropped_nodes += 1,
            Diagnostic::MalformedRecord {
                table: Table::Edges,
                ..
            }
            | Diagnostic::DanglingEdge { .. } => self.dropped_edges += 1,
            _ => {}
        }
        self.entries.push(diagnostic);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of rows dropped as malformed, across both tables.
    pub fn malformed_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|d| matches!(d, Diagnostic::MalformedRecord { .. }))
            .count()
    }
}

/// Content fingerprint of a normalized dataset, used as a cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetVersion(String);

impl DatasetVersion {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatasetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalized node and edge tables, grouped by period.
#[derive(Debug, Clone)]
pub struct Dataset {
    slices: BTreeMap<Period, Slice>,
    diagnostics: Diagnostics,
    version: DatasetVersion,
}

impl Dataset {
    /// All periods, sorted ascending.
    pub fn periods(&self) -> Vec<Period> {
        self.slices.keys().cloned().collect()
    }

    /// The slice for a period, if the period exists.
    pub fn slice(&self, period: &Period) -> Option<&Slice> {
        self.slices.get(period)
    }

    pub fn slices(&self) -> impl Iterator<Item = &Slice> {
        self.slices.values()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn version(&self) -> &DatasetVersion {
        &self.version
    }

    pub fn node_count(&self) -> usize {
        self.slices.values().map(|s| s.nodes.len()).sum()
    }

    pub fn edge_count(&self) -> usize {
        self.slices.values().map(|s| s.edges.len()).sum()
    }
}

/// Single normalization pass over raw node and edge tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordStore;

/// Per-table count of rows that needed a default for a column.
#[derive(Default)]
struct MissingCounts {
    counts: BTreeMap<&'static str, usize>,
}

impl MissingCounts {
    fn bump(&mut self, field: &'static str) {
        *self.counts.entry(field).or_insert(0) += 1;
    }

    fn report(self, table: Table, defaults: &[(&'static str, &str)], out: &mut Diagnostics) {
        for (field, default) in defaults {
            if let Some(&rows) = self.counts.get(field) {
                out.push(Diagnostic::MissingField {
                    table,
                    field: field.to_string(),
                    rows,
                    default: default.to_string(),
                });
            }
        }
    }
}

impl RecordStore {
    /// Normalize raw node and edge rows into a [`Dataset`].
    pub fn normalize(raw_nodes: &[RawRow], raw_edges: &[RawRow]) -> Dataset {
        let mut diagnostics = Diagnostics::default();
        let mut slices: BTreeMap<Period, Slice> = BTreeMap::new();

        // Periods come from every row that names one, even rows dropped
        // later, so a period whose rows are all bad still shows up as empty.
        for row in raw_nodes.iter().chain(raw_edges) {
            if let Some(period) = column(row, COL_PERIOD).and_then(identifier) {
                let period = Period::new(period);
                slices
                    .entry(period.clone())
                    .or_insert_with(|| Slice::empty(period));
            }
        }

        let mut missing = MissingCounts::default();
        let mut seen_ids: HashMap<Period, HashSet<String>> = HashMap::new();
        for (row_index, row) in raw_nodes.iter().enumerate() {
            match Self::node_from_row(row, &mut missing) {
                Ok(node) => {
                    let ids = seen_ids.entry(node.period.clone()).or_default();
                    if !ids.insert(node.id.clone()) {
                        diagnostics.push(Diagnostic::MalformedRecord {
                            table: Table::Nodes,
                            row: row_index,
                            reason: format!("duplicate id '{}' in {}", node.id, node.period),
                        });
                        continue;
                    }
                    if let Some(slice) = slices.get_mut(&node.period) {
                        slice.nodes.push(node);
                    }
                }
                Err(reason) => diagnostics.push(Diagnostic::MalformedRecord {
                    table: Table::Nodes,
                    row: row_index,
                    reason,
                }),
            }
        }
        missing.report(
            Table::Nodes,
            &[
                ("sentiment", "0.0"),
                ("cluster", UNKNOWN_CLUSTER),
                ("size", "1.0"),
            ],
            &mut diagnostics,
        );

        // id -> raw position, per period
        let positions: HashMap<Period, HashMap<String, Point>> = slices
            .iter()
            .map(|(period, slice)| {
                let by_id = slice
                    .nodes
                    .iter()
                    .map(|n| (n.id.clone(), n.position))
                    .collect();
                (period.clone(), by_id)
            })
            .collect();

        let mut missing = MissingCounts::default();
        for (row_index, row) in raw_edges.iter().enumerate() {
            match Self::edge_from_row(row, &positions, &mut missing) {
                Ok(edge) => {
                    if let Some(slice) = slices.get_mut(&edge.period) {
                        slice.edges.push(edge);
                    }
                }
                Err(EdgeRejection::Malformed(reason)) => {
                    diagnostics.push(Diagnostic::MalformedRecord {
                        table: Table::Edges,
                        row: row_index,
                        reason,
                    })
                }
                Err(EdgeRejection::Dangling {
                    period,
                    source_id,
                    target_id,
                }) => diagnostics.push(Diagnostic::DanglingEdge {
                    row: row_index,
                    period,
                    source_id,
                    target_id,
                }),
            }
        }
        missing.report(
            Table::Edges,
            &[("sentiment", "0.0"), ("weight", "1.0")],
            &mut diagnostics,
        );

        for slice in slices.values().filter(|s| s.is_empty()) {
            diagnostics.push(Diagnostic::EmptySlice {
                period: slice.period.clone(),
            });
        }

        let version = fingerprint(&slices);
        tracing::debug!(
            periods = slices.len(),
            version = %version,
            warnings = diagnostics.len(),
            "normalized dataset"
        );

        Dataset {
            slices,
            diagnostics,
            version,
        }
    }

    fn node_from_row(row: &RawRow, missing: &mut MissingCounts) -> Result<Node, String> {
        let id = column(row, COL_ID)
            .and_then(identifier)
            .ok_or("missing id")?;
        let period = column(row, COL_PERIOD)
            .and_then(identifier)
            .ok_or("missing period")?;
        let x = column(row, COL_X).and_then(number);
        let y = column(row, COL_Y).and_then(number);
        let position = match (x, y) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Point::new(x, y),
            _ => return Err("missing or non-finite coordinates".to_string()),
        };

        let cluster = match column(row, COL_CLUSTER).and_then(identifier) {
            Some(cluster) => cluster,
            None => {
                missing.bump("cluster");
                UNKNOWN_CLUSTER.to_string()
            }
        };
        let sentiment = sentiment(row, missing);
        let size = match column(row, COL_SIZE).and_then(number) {
            Some(size) if size.is_finite() && size >= 0.0 => size,
            _ => {
                missing.bump("size");
                DEFAULT_SIZE
            }
        };

        let reserved = [COL_ID, COL_X, COL_Y, COL_CLUSTER, COL_SENTIMENT, COL_SIZE, COL_PERIOD];
        Ok(Node {
            id,
            position,
            cluster,
            sentiment,
            size,
            text_fields: text_fields(row, &reserved),
            period: Period::new(period),
        })
    }

    fn edge_from_row(
        row: &RawRow,
        positions: &HashMap<Period, HashMap<String, Point>>,
        missing: &mut MissingCounts,
    ) -> Result<Edge, EdgeRejection> {
        let source_id = column(row, COL_SOURCE)
            .and_then(identifier)
            .ok_or_else(|| EdgeRejection::Malformed("missing source_id".to_string()))?;
        let target_id = column(row, COL_TARGET)
            .and_then(identifier)
            .ok_or_else(|| EdgeRejection::Malformed("missing target_id".to_string()))?;
        let period = column(row, COL_PERIOD)
            .and_then(identifier)
            .map(Period::new)
            .ok_or_else(|| EdgeRejection::Malformed("missing period".to_string()))?;

        let weight = match column(row, COL_WEIGHT).map(number) {
            None => None,
            Some(Some(w)) if w.is_finite() && w >= 0.0 => Some(w),
            Some(_) => {
                return Err(EdgeRejection::Malformed(
                    "weight is negative or not a number".to_string(),
                ))
            }
        };

        let nodes = positions.get(&period);
        let endpoint = |id: &str| nodes.and_then(|n| n.get(id)).copied();
        let (from, to) = match (endpoint(&source_id), endpoint(&target_id)) {
            (Some(from), Some(to)) => (from, to),
            _ => {
                return Err(EdgeRejection::Dangling {
                    period,
                    source_id,
                    target_id,
                })
            }
        };

        // Explicit endpoint columns win over the referenced node positions.
        let explicit: Vec<Option<f64>> = COL_ENDPOINTS
            .iter()
            .map(|name| row.get(*name).filter(|v| !v.is_null()).map(|v| number(v).unwrap_or(f64::NAN)))
            .collect();
        let (from, to) = match explicit.as_slice() {
            [None, None, None, None] => (from, to),
            [Some(x0), Some(y0), Some(x1), Some(y1)]
                if [x0, y0, x1, y1].iter().all(|v| v.is_finite()) =>
            {
                (Point::new(*x0, *y0), Point::new(*x1, *y1))
            }
            _ => {
                return Err(EdgeRejection::Malformed(
                    "incomplete or non-finite endpoint coordinates".to_string(),
                ))
            }
        };

        let weight = weight.unwrap_or_else(|| {
            missing.bump("weight");
            DEFAULT_WEIGHT
        });
        let color = column(row, COL_COLOR).and_then(|v| v.as_str()).map(str::to_string);
        let sentiment = sentiment(row, missing);

        let reserved = [
            COL_SOURCE,
            COL_TARGET,
            COL_PERIOD,
            COL_WEIGHT,
            COL_SENTIMENT,
            COL_COLOR,
            &COL_ENDPOINTS[..],
        ];
        Ok(Edge {
            source_id,
            target_id,
            from,
            to,
            weight,
            sentiment,
            color,
            text_fields: text_fields(row, &reserved),
            period,
        })
    }
}

enum EdgeRejection {
    Malformed(String),
    Dangling {
        period: Period,
        source_id: String,
        target_id: String,
    },
}

/// First non-null value among a column and its aliases.
fn column<'r>(row: &'r RawRow, names: &[&str]) -> Option<&'r Value> {
    names
        .iter()
        .filter_map(|name| row.get(*name))
        .find(|v| !v.is_null())
}

/// Coerce a cell into a number. Lists contribute their first element.
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Array(items) => items.first().and_then(number),
        _ => None,
    }
}

/// Coerce a cell into a non-empty identifier.
fn identifier(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Coerce a cell into display text. Null stays `None`.
fn text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => Some(i.to_string()),
            (_, Some(u), _) => Some(u.to_string()),
            (_, _, Some(f)) if f.is_finite() => Some(f.to_string()),
            _ => None,
        },
        Value::Array(items) => items.first().and_then(text),
        Value::Object(_) => Some(value.to_string()),
    }
}

fn sentiment(row: &RawRow, missing: &mut MissingCounts) -> f64 {
    match column(row, COL_SENTIMENT).and_then(number) {
        Some(s) if s.is_finite() => s.clamp(-1.0, 1.0),
        _ => {
            missing.bump("sentiment");
            DEFAULT_SENTIMENT
        }
    }
}

/// Every column not consumed by a typed field, in source order.
fn text_fields(row: &RawRow, reserved: &[&[&str]]) -> Vec<TextField> {
    row.iter()
        .filter(|(name, _)| !reserved.iter().any(|names| names.contains(&name.as_str())))
        .map(|(name, value)| TextField::new(name.clone(), text(value)))
        .collect()
}

/// SHA-256 over the normalized content, hex-encoded (first 16 bytes).
fn fingerprint(slices: &BTreeMap<Period, Slice>) -> DatasetVersion {
    let mut hasher = Sha256::new();
    let mut put = |bytes: &[u8]| {
        hasher.update((bytes.len() as u64).to_le_bytes());
        hasher.update(bytes);
    };
    for (period, slice) in slices {
        put(period.as_str().as_bytes());
        for node in &slice.nodes {
            put(node.id.as_bytes());
            put(&node.position.x.to_le_bytes());
            put(&node.position.y.to_le_bytes());
            put(node.cluster.as_bytes());
            put(&node.sentiment.to_le_bytes());
            put(&node.size.to_le_bytes());
            for field in &node.text_fields {
                put(field.name.as_bytes());
                put(field.value.as_deref().unwrap_or("\u{0}").as_bytes());
            }
        }
        for edge in &slice.edges {
            put(edge.source_id.as_bytes());
            put(edge.target_id.as_bytes());
            for v in [edge.from.x, edge.from.y, edge.to.x, edge.to.y, edge.weight, edge.sentiment] {
                put(&v.to_le_bytes());
            }
            put(edge.color.as_deref().unwrap_or("\u{0}").as_bytes());
            for field in &edge.text_fields {
                put(field.name.as_bytes());
                put(field.value.as_deref().unwrap_or("\u{0}").as_bytes());
            }
        }
    }
    let hash = hasher.finalize();
    DatasetVersion(hash.iter().take(16).map(|b| format!("{:02x}", b)).collect())
}

/// Convenience for building raw rows in code (tests, sample data).
pub fn row(pairs: impl IntoIterator<Item = (&'static str, Value)>) -> RawRow {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}
