//! Node connectivity within a slice.
//!
//! A node counts as connected when its render-space position coincides with
//! an endpoint of at least one edge of the same slice. Matching is done on
//! coordinates rather than ids: the upstream tables join nodes and edges by
//! position, and two distinct nodes that share a coordinate are both
//! connected once that coordinate shows up on an edge.

use crate::layout::Point;
use crate::records::Slice;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Hashable exact key for a coordinate.
///
/// Uses the IEEE-754 bit patterns, with `-0.0` folded into `0.0` so that key
/// equality agrees with `==` on finite values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoordKey(u64, u64);

impl CoordKey {
    pub fn new(p: Point) -> Self {
        Self(canonical_bits(p.x), canonical_bits(p.y))
    }
}

impl From<Point> for CoordKey {
    fn from(p: Point) -> Self {
        Self::new(p)
    }
}

fn canonical_bits(v: f64) -> u64 {
    if v == 0.0 {
        0.0f64.to_bits()
    } else {
        v.to_bits()
    }
}

/// Connectivity of one slice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Connectivity {
    /// Parallel to the slice's nodes.
    pub flags: Vec<bool>,
    pub connected: usize,
    /// `connected / total * 100`, zero for an empty slice.
    pub percentage: f64,
}

impl Connectivity {
    pub fn total(&self) -> usize {
        self.flags.len()
    }

    pub fn is_connected(&self, index: usize) -> bool {
        self.flags.get(index).copied().unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectivityFilter;

impl ConnectivityFilter {
    /// Flag every node whose position matches some edge endpoint.
    ///
    /// Expects a render-space slice (node positions and edge endpoints in
    /// the same frame).
    pub fn compute(slice: &Slice) -> Connectivity {
        let endpoints: HashSet<CoordKey> = slice
            .edges
            .iter()
            .flat_map(|e| [CoordKey::new(e.from), CoordKey::new(e.to)])
            .collect();

        let flags: Vec<bool> = slice
            .nodes
            .iter()
            .map(|n| endpoints.contains(&CoordKey::new(n.position)))
            .collect();
        let connected = flags.iter().filter(|&&f| f).count();
        let percentage = if flags.is_empty() {
            0.0
        } else {
            connected as f64 / flags.len() as f64 * 100.0
        };

        Connectivity {
            flags,
            connected,
            percentage,
        }
    }

    /// Cluster at each node coordinate. The first node in slice order wins
    /// when several share a position.
    pub fn clusters_by_coord(slice: &Slice) -> HashMap<CoordKey, &str> {
        let mut at: HashMap<CoordKey, &str> = HashMap::new();
        for node in &slice.nodes {
            at.entry(CoordKey::new(node.position))
                .or_insert(node.cluster.as_str());
        }
        at
    }
}
