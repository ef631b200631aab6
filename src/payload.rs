//! Render payload assembly.
//!
//! [`SlicePayloadBuilder`] runs one period of a [`Dataset`] through the whole
//! pipeline (layout, connectivity, colors, hover text, statistics) and
//! returns an immutable [`RenderPayload`]. Payloads are memoized by dataset
//! version and period in a small bounded cache and handed out as `Arc`s, so
//! switching back and forth between periods is free after the first visit.
//!
//! [`Session`] pairs a builder with one [`TimeNavigator`]; it is what a UI
//! event layer holds on to.

use crate::colors::{ClusterStyle, ColorScheme, Contrast};
use crate::config::NarrativeConfig;
use crate::connectivity::{ConnectivityFilter, CoordKey};
use crate::error::{NavigationError, Result};
use crate::hover::HoverTextFormatter;
use crate::layout::{LabelAnchor, LabelPlacement, LayoutTransformer, Point};
use crate::metrics::{SliceStatistics, StatisticsAggregator};
use crate::navigator::TimeNavigator;
use crate::records::{Dataset, DatasetVersion, Diagnostic, Period, Slice};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A node ready to draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderNode {
    pub id: String,
    /// Render-space position.
    pub position: Point,
    pub cluster: String,
    pub sentiment: f64,
    pub size: f64,
    pub connected: bool,
    pub color: String,
    pub icon: Option<String>,
    pub hover: String,
    pub hover_background: String,
    pub hover_foreground: Contrast,
}

/// An edge ready to draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderEdge {
    pub source_id: String,
    pub target_id: String,
    pub from: Point,
    pub to: Point,
    pub weight: f64,
    pub sentiment: f64,
    pub color: String,
    pub hover: String,
}

/// Everything a frontend needs to draw one period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderPayload {
    pub period: Period,
    pub period_label: String,
    pub dataset_version: DatasetVersion,
    pub nodes: Vec<RenderNode>,
    pub edges: Vec<RenderEdge>,
    /// One entry per cluster present in the slice, by label.
    pub cluster_styles: Vec<ClusterStyle>,
    pub labels: Vec<LabelAnchor>,
    pub statistics: SliceStatistics,
    /// Diagnostics that concern this period.
    pub diagnostics: Vec<Diagnostic>,
}

impl RenderPayload {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

type CacheKey = (DatasetVersion, Period);

/// Insertion-ordered cache that evicts its oldest entry when full.
#[derive(Debug)]
struct PayloadCache {
    capacity: usize,
    entries: HashMap<CacheKey, Arc<RenderPayload>>,
    order: VecDeque<CacheKey>,
}

impl PayloadCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn get(&self, key: &CacheKey) -> Option<Arc<RenderPayload>> {
        self.entries.get(key).cloned()
    }

    fn insert(&mut self, key: CacheKey, payload: Arc<RenderPayload>) -> Arc<RenderPayload> {
        if self.capacity == 0 {
            return payload;
        }
        // A concurrent build may have got here first; keep the existing one.
        if let Some(existing) = self.entries.get(&key) {
            return existing.clone();
        }
        while self.entries.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, payload.clone());
        payload
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

/// Builds and memoizes render payloads.
#[derive(Debug)]
pub struct SlicePayloadBuilder {
    formatter: HoverTextFormatter,
    placement: LabelPlacement,
    cache: Mutex<PayloadCache>,
}

impl Default for SlicePayloadBuilder {
    fn default() -> Self {
        Self::new(&NarrativeConfig::default())
    }
}

impl SlicePayloadBuilder {
    pub fn new(config: &NarrativeConfig) -> Self {
        Self {
            formatter: HoverTextFormatter::new(&config.hover),
            placement: config.labels.placement(),
            cache: Mutex::new(PayloadCache::new(config.cache.capacity)),
        }
    }

    /// Payload for one period, from the cache when possible.
    pub fn build(&self, dataset: &Dataset, period: &Period) -> Result<Arc<RenderPayload>> {
        let key = (dataset.version().clone(), period.clone());
        if let Some(hit) = self.cache().get(&key) {
            tracing::trace!(period = %period, "payload cache hit");
            return Ok(hit);
        }

        let slice = dataset
            .slice(period)
            .ok_or_else(|| NavigationError::UnknownPeriod(period.to_string()))?;
        let payload = Arc::new(self.render(dataset, slice));
        Ok(self.cache().insert(key, payload))
    }

    /// Build every period in parallel and seed the cache.
    pub fn precompute(&self, dataset: &Dataset) -> Result<Vec<Arc<RenderPayload>>> {
        let periods = dataset.periods();
        tracing::debug!(periods = periods.len(), "precomputing payloads");
        periods
            .par_iter()
            .map(|period| self.build(dataset, period))
            .collect()
    }

    pub fn cached(&self) -> usize {
        self.cache().entries.len()
    }

    pub fn clear(&self) {
        self.cache().clear();
    }

    /// Run a slice through the pipeline without touching the cache.
    pub fn render(&self, dataset: &Dataset, slice: &Slice) -> RenderPayload {
        let slice = LayoutTransformer::apply(slice);
        let connectivity = ConnectivityFilter::compute(&slice);
        let statistics = StatisticsAggregator::compute(&slice, &connectivity);

        let clusters: BTreeSet<&str> = slice.nodes.iter().map(|n| n.cluster.as_str()).collect();
        let styles: HashMap<&str, ClusterStyle> = clusters
            .iter()
            .map(|c| (*c, ColorScheme::resolve(c)))
            .collect();

        let nodes: Vec<RenderNode> = slice
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| {
                let style = styles
                    .get(node.cluster.as_str())
                    .cloned()
                    .unwrap_or_else(|| ColorScheme::resolve(&node.cluster));
                RenderNode {
                    id: node.id.clone(),
                    position: node.position,
                    cluster: node.cluster.clone(),
                    sentiment: node.sentiment,
                    size: node.size,
                    connected: connectivity.is_connected(i),
                    hover: self.formatter.node_hover(node),
                    hover_background: ColorScheme::hover_background(&style.color),
                    hover_foreground: ColorScheme::contrast_color(&style.color),
                    color: style.color,
                    icon: style.icon,
                }
            })
            .collect();

        // Same endpoint resolution as the statistics: by coordinate.
        let cluster_at = ConnectivityFilter::clusters_by_coord(&slice);
        let edges: Vec<RenderEdge> = slice
            .edges
            .iter()
            .map(|edge| RenderEdge {
                source_id: edge.source_id.clone(),
                target_id: edge.target_id.clone(),
                from: edge.from,
                to: edge.to,
                weight: edge.weight,
                sentiment: edge.sentiment,
                color: edge
                    .color
                    .clone()
                    .unwrap_or_else(|| ColorScheme::sentiment_color(edge.sentiment)),
                hover: self.formatter.edge_hover(
                    edge,
                    cluster_at.get(&CoordKey::new(edge.from)).copied(),
                    cluster_at.get(&CoordKey::new(edge.to)).copied(),
                ),
            })
            .collect();

        let diagnostics: Vec<Diagnostic> = dataset
            .diagnostics()
            .iter()
            .filter(|d| match d {
                Diagnostic::EmptySlice { period } | Diagnostic::DanglingEdge { period, .. } => {
                    *period == slice.period
                }
                _ => false,
            })
            .cloned()
            .collect();

        tracing::debug!(
            period = %slice.period,
            nodes = nodes.len(),
            edges = edges.len(),
            rate = statistics.co_occurrence_rate,
            "built payload"
        );

        RenderPayload {
            period_label: slice.period.display_label(),
            period: slice.period.clone(),
            dataset_version: dataset.version().clone(),
            labels: self.placement.anchors(&slice.nodes),
            cluster_styles: clusters.iter().map(|c| ColorScheme::resolve(c)).collect(),
            nodes,
            edges,
            statistics,
            diagnostics,
        }
    }

    fn cache(&self) -> MutexGuard<'_, PayloadCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One viewer's navigation state over a shared dataset and builder.
#[derive(Debug, Clone)]
pub struct Session {
    dataset: Arc<Dataset>,
    builder: Arc<SlicePayloadBuilder>,
    navigator: TimeNavigator,
}

impl Session {
    pub fn new(dataset: Arc<Dataset>, builder: Arc<SlicePayloadBuilder>) -> Result<Self> {
        let navigator = TimeNavigator::new(dataset.periods())?;
        Ok(Self {
            dataset,
            builder,
            navigator,
        })
    }

    pub fn navigator(&self) -> &TimeNavigator {
        &self.navigator
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Payload for the selected period.
    pub fn current(&self) -> Result<Arc<RenderPayload>> {
        self.builder.build(&self.dataset, self.navigator.selected())
    }

    pub fn advance(&mut self) -> bool {
        self.navigator.advance()
    }

    pub fn retreat(&mut self) -> bool {
        self.navigator.retreat()
    }

    pub fn jump_to(&mut self, index: usize) -> bool {
        self.navigator.jump_to(index)
    }

    pub fn select(&mut self, label: &str) -> Result<bool> {
        self.navigator.select(label)
    }
}
