//! Slice statistics.
//!
//! Summaries shown next to the network for the active period:
//! - Slice totals: nodes, edges, connected nodes and the co-occurrence rate
//!   (share of nodes touching at least one edge).
//! - Per cluster: node count, share of the slice, mean sentiment, and the
//!   two clusters it co-occurs with most by summed edge weight.
//!
//! Everything here is a pure function of a render-space slice and its
//! connectivity.

use crate::connectivity::{Connectivity, ConnectivityFilter, CoordKey};
use crate::records::Slice;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// How many partner clusters are kept per cluster.
pub const TOP_CO_OCCURRENCES: usize = 2;

/// A partner cluster and how strongly it co-occurs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoOccurrence {
    pub cluster: String,
    /// Summed weight of edges between the two clusters.
    pub weight: f64,
    /// `min(99, floor(weight / count * 100))` where count is the owning
    /// cluster's node count.
    pub share: u32,
}

/// Per-cluster summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterStats {
    pub cluster: String,
    pub count: usize,
    pub percentage_of_slice: f64,
    pub mean_sentiment: f64,
    pub top_co_occurrences: Vec<CoOccurrence>,
}

/// Slice-level summary with per-cluster breakdown.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SliceStatistics {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub connected_nodes: usize,
    /// In [0, 100]; 0 when the slice has no nodes.
    pub co_occurrence_rate: f64,
    /// Sorted by cluster label.
    pub clusters: Vec<ClusterStats>,
}

impl SliceStatistics {
    pub fn cluster(&self, name: &str) -> Option<&ClusterStats> {
        self.clusters.iter().find(|c| c.cluster == name)
    }

    /// Clusters by share of the slice, largest first, ties by label.
    pub fn ranked(&self) -> Vec<&ClusterStats> {
        let mut ranked: Vec<&ClusterStats> = self.clusters.iter().collect();
        ranked.sort_by(|a, b| {
            b.percentage_of_slice
                .total_cmp(&a.percentage_of_slice)
                .then_with(|| a.cluster.cmp(&b.cluster))
        });
        ranked
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StatisticsAggregator;

impl StatisticsAggregator {
    pub fn compute(slice: &Slice, connectivity: &Connectivity) -> SliceStatistics {
        let total_nodes = slice.nodes.len();
        if total_nodes == 0 {
            return SliceStatistics {
                total_edges: slice.edges.len(),
                ..SliceStatistics::default()
            };
        }

        // cluster -> (count, sentiment sum)
        let mut tallies: BTreeMap<&str, (usize, f64)> = BTreeMap::new();
        for node in &slice.nodes {
            let entry = tallies.entry(node.cluster.as_str()).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += node.sentiment;
        }

        let partners = Self::partner_weights(slice);

        let clusters = tallies
            .into_iter()
            .map(|(cluster, (count, sentiment_sum))| {
                let mean = sentiment_sum / count as f64;
                ClusterStats {
                    cluster: cluster.to_string(),
                    count,
                    percentage_of_slice: count as f64 / total_nodes as f64 * 100.0,
                    mean_sentiment: if mean.is_nan() { 0.0 } else { mean },
                    top_co_occurrences: Self::top_partners(partners.get(cluster), count),
                }
            })
            .collect();

        SliceStatistics {
            total_nodes,
            total_edges: slice.edges.len(),
            connected_nodes: connectivity.connected,
            co_occurrence_rate: connectivity.connected as f64 / total_nodes as f64 * 100.0,
            clusters,
        }
    }

    /// Summed edge weight between each pair of distinct clusters, both ways.
    ///
    /// Endpoints resolve to the first node in slice order at that coordinate.
    fn partner_weights(slice: &Slice) -> HashMap<&str, BTreeMap<&str, f64>> {
        let at = ConnectivityFilter::clusters_by_coord(slice);

        let mut partners: HashMap<&str, BTreeMap<&str, f64>> = HashMap::new();
        for edge in &slice.edges {
            let (Some(&a), Some(&b)) = (
                at.get(&CoordKey::new(edge.from)),
                at.get(&CoordKey::new(edge.to)),
            ) else {
                continue;
            };
            if a == b {
                continue;
            }
            *partners.entry(a).or_default().entry(b).or_insert(0.0) += edge.weight;
            *partners.entry(b).or_default().entry(a).or_insert(0.0) += edge.weight;
        }
        partners
    }

    fn top_partners(weights: Option<&BTreeMap<&str, f64>>, count: usize) -> Vec<CoOccurrence> {
        let Some(weights) = weights else {
            return Vec::new();
        };
        let mut ranked: Vec<(&str, f64)> = weights.iter().map(|(k, v)| (*k, *v)).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
            .into_iter()
            .take(TOP_CO_OCCURRENCES)
            .map(|(cluster, weight)| CoOccurrence {
                cluster: cluster.to_string(),
                weight,
                share: share(weight, count),
            })
            .collect()
    }
}

fn share(weight: f64, count: usize) -> u32 {
    if count == 0 {
        return 0;
    }
    let pct = (weight / count as f64 * 100.0).floor();
    pct.clamp(0.0, 99.0) as u32
}
