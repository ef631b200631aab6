//! Render-space layout.
//!
//! Upstream layout coordinates are produced in a frame whose "flow
//! direction" runs along the wrong axis for the chart, so every position is
//! turned a quarter turn before it reaches the renderer:
//!
//! ```text
//! x' = -y
//! y' =  x
//! ```
//!
//! The same rotation is applied to node positions and to both endpoints of
//! every edge, which keeps the coordinate join between the two tables intact
//! (see [`crate::connectivity`]).
//!
//! This module also places the floating cluster labels: one anchor per
//! cluster at the size-weighted centroid of its nodes, nudged outward so
//! labels fan out instead of stacking on top of dense clusters.

use crate::records::{Edge, Node, Slice};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::PI;

/// A 2D coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Both components are finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// The fixed quarter-turn orientation transform.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutTransformer;

impl LayoutTransformer {
    /// Rotate a raw coordinate into render space (+90°).
    pub fn rotate(p: Point) -> Point {
        Point::new(-p.y, p.x)
    }

    /// Rotate a render-space coordinate back into the raw frame (-90°).
    pub fn inverse(p: Point) -> Point {
        Point::new(p.y, -p.x)
    }

    /// Rotate a node's position.
    pub fn transform_node(node: &Node) -> Node {
        Node {
            position: Self::rotate(node.position),
            ..node.clone()
        }
    }

    /// Rotate both endpoints of an edge.
    pub fn transform_edge(edge: &Edge) -> Edge {
        Edge {
            from: Self::rotate(edge.from),
            to: Self::rotate(edge.to),
            ..edge.clone()
        }
    }

    /// Move a whole slice into render space.
    pub fn apply(slice: &Slice) -> Slice {
        Slice {
            period: slice.period.clone(),
            nodes: slice.nodes.iter().map(Self::transform_node).collect(),
            edges: slice.edges.iter().map(Self::transform_edge).collect(),
        }
    }
}

/// How cluster labels are pushed away from their centroids.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelPlacement {
    /// Total angle the label offsets are spread over, in radians.
    pub sweep: f64,
    /// Distance each label is pushed from its centroid.
    pub radius: f64,
}

impl Default for LabelPlacement {
    fn default() -> Self {
        Self {
            sweep: 1.2 * PI,
            radius: 0.27,
        }
    }
}

/// Where a cluster's floating label sits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelAnchor {
    pub cluster: String,
    pub position: Point,
}

impl LabelPlacement {
    /// Compute one label anchor per cluster, in cluster-label order.
    ///
    /// Expects render-space nodes. The i-th of n clusters is offset along
    /// `i * sweep / n + PI / n`.
    pub fn anchors(&self, nodes: &[Node]) -> Vec<LabelAnchor> {
        // (weighted x, weighted y, total weight, plain x, plain y, count)
        let mut sums: BTreeMap<&str, (f64, f64, f64, f64, f64, usize)> = BTreeMap::new();
        for node in nodes {
            let entry = sums
                .entry(node.cluster.as_str())
                .or_insert((0.0, 0.0, 0.0, 0.0, 0.0, 0));
            entry.0 += node.position.x * node.size;
            entry.1 += node.position.y * node.size;
            entry.2 += node.size;
            entry.3 += node.position.x;
            entry.4 += node.position.y;
            entry.5 += 1;
        }

        let n = sums.len() as f64;
        sums.into_iter()
            .enumerate()
            .map(|(i, (cluster, (wx, wy, w, px, py, count)))| {
                // All-zero sizes would make the weighted mean undefined
                let centroid = if w > 0.0 {
                    Point::new(wx / w, wy / w)
                } else {
                    Point::new(px / count as f64, py / count as f64)
                };
                let angle = i as f64 * self.sweep / n + PI / n;
                LabelAnchor {
                    cluster: cluster.to_string(),
                    position: Point::new(
                        centroid.x + self.radius * angle.cos(),
                        centroid.y + self.radius * angle.sin(),
                    ),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{Period, TextField};
    use proptest::prelude::*;

    fn node(id: &str, cluster: &str, x: f64, y: f64, size: f64) -> Node {
        Node {
            id: id.to_string(),
            position: Point::new(x, y),
            cluster: cluster.to_string(),
            sentiment: 0.0,
            size,
            text_fields: Vec::<TextField>::new(),
            period: Period::new("2024Q1"),
        }
    }

    #[test]
    fn test_rotate_quarter_turn() {
        assert_eq!(LayoutTransformer::rotate(Point::new(1.0, 0.0)), Point::new(0.0, 1.0));
        assert_eq!(LayoutTransformer::rotate(Point::new(0.0, 1.0)), Point::new(-1.0, 0.0));
        assert_eq!(LayoutTransformer::rotate(Point::new(2.5, -3.0)), Point::new(3.0, 2.5));
    }

    #[test]
    fn test_edges_rotate_both_endpoints() {
        let edge = Edge {
            source_id: "a".into(),
            target_id: "b".into(),
            from: Point::new(1.0, 2.0),
            to: Point::new(-3.0, 4.0),
            weight: 1.0,
            sentiment: 0.0,
            color: None,
            text_fields: Vec::new(),
            period: Period::new("2024Q1"),
        };
        let rotated = LayoutTransformer::transform_edge(&edge);
        assert_eq!(rotated.from, Point::new(-2.0, 1.0));
        assert_eq!(rotated.to, Point::new(-4.0, -3.0));
        assert_eq!(rotated.source_id, "a");
    }

    #[test]
    fn test_single_cluster_label_offset() {
        let placement = LabelPlacement {
            sweep: PI,
            radius: 1.0,
        };
        let nodes = vec![node("a", "Awareness", 0.0, 0.0, 1.0), node("b", "Awareness", 2.0, 0.0, 1.0)];
        let anchors = placement.anchors(&nodes);
        assert_eq!(anchors.len(), 1);
        // one cluster: angle = PI / 1, so the label moves one unit left of (1, 0)
        assert!((anchors[0].position.x - 0.0).abs() < 1e-12);
        assert!(anchors[0].position.y.abs() < 1e-12);
    }

    #[test]
    fn test_label_centroid_is_size_weighted() {
        let placement = LabelPlacement {
            sweep: 0.0,
            radius: 0.0,
        };
        let nodes = vec![node("a", "X", 0.0, 0.0, 3.0), node("b", "X", 4.0, 0.0, 1.0)];
        let anchors = placement.anchors(&nodes);
        assert!((anchors[0].position.x - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_sizes_fall_back_to_plain_mean() {
        let placement = LabelPlacement {
            sweep: 0.0,
            radius: 0.0,
        };
        let nodes = vec![node("a", "X", 0.0, 2.0, 0.0), node("b", "X", 4.0, 0.0, 0.0)];
        let anchors = placement.anchors(&nodes);
        assert_eq!(anchors[0].position, Point::new(2.0, 1.0));
    }

    #[test]
    fn test_labels_sorted_by_cluster() {
        let nodes = vec![node("a", "Zen", 0.0, 0.0, 1.0), node("b", "Awareness", 1.0, 1.0, 1.0)];
        let anchors = LabelPlacement::default().anchors(&nodes);
        let names: Vec<&str> = anchors.iter().map(|a| a.cluster.as_str()).collect();
        assert_eq!(names, vec!["Awareness", "Zen"]);
    }

    proptest! {
        #[test]
        fn rotation_then_inverse_is_identity(x in -1.0e9f64..1.0e9, y in -1.0e9f64..1.0e9) {
            let p = Point::new(x, y);
            prop_assert_eq!(LayoutTransformer::inverse(LayoutTransformer::rotate(p)), p);
            prop_assert_eq!(LayoutTransformer::rotate(LayoutTransformer::inverse(p)), p);
        }
    }
}
