//! End-to-end tests: raw rows in, render payloads out.

use narrative_web::colors::{ColorScheme, Contrast};
use narrative_web::layout::Point;
use narrative_web::records::{row, Diagnostic, Period, RawRow, RecordStore};
use narrative_web::sample::{self, SampleOptions};
use narrative_web::{NavigationError, Session, SlicePayloadBuilder, TimeNavigator};
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;

fn node(id: &str, period: &str, cluster: &str, x: f64, y: f64) -> RawRow {
    row([
        ("id", json!(id)),
        ("period", json!(period)),
        ("cluster", json!(cluster)),
        ("x", json!(x)),
        ("y", json!(y)),
    ])
}

fn edge(source: &str, target: &str, period: &str) -> RawRow {
    row([
        ("source_id", json!(source)),
        ("target_id", json!(target)),
        ("period", json!(period)),
    ])
}

#[test]
fn single_isolated_node() {
    let dataset = RecordStore::normalize(&[node("A", "2024Q1", "Awareness", 1.0, 0.0)], &[]);
    let payload = SlicePayloadBuilder::default()
        .build(&dataset, &Period::new("2024Q1"))
        .unwrap();

    let stats = &payload.statistics;
    assert_eq!(stats.connected_nodes, 0);
    assert_eq!(stats.co_occurrence_rate, 0.0);
    let awareness = stats.cluster("Awareness").unwrap();
    assert_eq!(awareness.count, 1);
    assert_eq!(awareness.percentage_of_slice, 100.0);
    assert_eq!(awareness.mean_sentiment, 0.0);
    assert!(!payload.nodes[0].connected);
}

#[test]
fn two_nodes_one_edge() {
    let nodes = vec![
        node("A", "2024Q1", "Awareness", 1.0, 0.0),
        node("B", "2024Q1", "Awareness", 0.0, 1.0),
    ];
    let dataset = RecordStore::normalize(&nodes, &[edge("A", "B", "2024Q1")]);
    let payload = SlicePayloadBuilder::default()
        .build(&dataset, &Period::new("2024Q1"))
        .unwrap();

    assert_eq!(payload.nodes[0].position, Point::new(0.0, 1.0));
    assert_eq!(payload.nodes[1].position, Point::new(-1.0, 0.0));
    assert_eq!(payload.statistics.connected_nodes, 2);
    assert_eq!(payload.statistics.co_occurrence_rate, 100.0);
    assert_eq!(payload.edges.len(), 1);
}

#[test]
fn missing_sentiment_is_a_warning_not_an_error() {
    let dataset = RecordStore::normalize(&[node("A", "2024Q1", "Awareness", 0.0, 0.0)], &[]);
    assert!(dataset.diagnostics().iter().any(|d| matches!(
        d,
        Diagnostic::MissingField { field, rows: 1, .. } if field == "sentiment"
    )));
    let payload = SlicePayloadBuilder::default()
        .build(&dataset, &Period::new("2024Q1"))
        .unwrap();
    assert_eq!(payload.nodes[0].sentiment, 0.0);
}

#[test]
fn empty_period_gives_empty_payload() {
    let bad = row([("id", json!("ghost")), ("period", json!("2023Q4"))]);
    let dataset = RecordStore::normalize(&[bad, node("A", "2024Q1", "Awareness", 1.0, 0.0)], &[]);
    let payload = SlicePayloadBuilder::default()
        .build(&dataset, &Period::new("2023Q4"))
        .unwrap();

    assert!(payload.is_empty());
    assert!(payload.edges.is_empty());
    assert!(payload.labels.is_empty());
    assert_eq!(payload.statistics.total_nodes, 0);
    assert_eq!(payload.statistics.co_occurrence_rate, 0.0);
    assert!(payload.statistics.clusters.is_empty());
    assert_eq!(
        payload.diagnostics,
        vec![Diagnostic::EmptySlice {
            period: Period::new("2023Q4")
        }]
    );
}

#[test]
fn dangling_edge_shows_up_in_its_period() {
    let dataset = RecordStore::normalize(
        &[node("A", "2024Q1", "Awareness", 1.0, 0.0)],
        &[edge("A", "missing", "2024Q1")],
    );
    let payload = SlicePayloadBuilder::default()
        .build(&dataset, &Period::new("2024Q1"))
        .unwrap();
    assert!(payload.edges.is_empty());
    assert!(matches!(payload.diagnostics[0], Diagnostic::DanglingEdge { .. }));
}

#[test]
fn contrast_examples() {
    assert_eq!(ColorScheme::contrast_color("#FFFFFF"), Contrast::Black);
    assert_eq!(ColorScheme::contrast_color("#000000"), Contrast::White);
    assert_eq!(ColorScheme::contrast_color("#BABABA"), Contrast::White);
}

#[test]
fn session_walks_the_sample_dataset() {
    let options = SampleOptions::default();
    let tables = sample::generate(3, &options);
    let dataset = Arc::new(RecordStore::normalize(&tables.nodes, &tables.edges));
    let builder = Arc::new(SlicePayloadBuilder::default());
    let mut session = Session::new(dataset.clone(), builder.clone()).unwrap();

    assert!(session.navigator().is_at_end());
    let latest = session.current().unwrap();
    assert_eq!(latest.period_label, sample::quarter(options.periods - 1));

    while session.retreat() {}
    let earliest = session.current().unwrap();
    assert_eq!(earliest.period.as_str(), "2023Q1");
    assert_eq!(builder.cached(), 2);

    for payload in builder.precompute(&dataset).unwrap() {
        let stats = &payload.statistics;
        assert_eq!(stats.total_nodes, options.nodes_per_period);
        assert!((0.0..=100.0).contains(&stats.co_occurrence_rate));
        let sum: f64 = stats.clusters.iter().map(|c| c.percentage_of_slice).sum();
        assert!((sum - 100.0).abs() < 1e-9);
        assert_eq!(payload.labels.len(), stats.clusters.len());
        assert_eq!(payload.cluster_styles.len(), stats.clusters.len());
    }
}

#[test]
fn payloads_serialize_to_json() {
    let tables = sample::generate(11, &SampleOptions::default());
    let dataset = RecordStore::normalize(&tables.nodes, &tables.edges);
    let payload = SlicePayloadBuilder::default()
        .build(&dataset, &dataset.periods()[0])
        .unwrap();
    let value = serde_json::to_value(&*payload).unwrap();
    assert_eq!(value["period"], json!("2023Q1"));
    assert_eq!(value["dataset_version"], json!(dataset.version().as_str()));
    assert!(value["nodes"][0]["hover"].as_str().unwrap().starts_with("<b>Topic:</b>"));
}

#[test]
fn navigator_without_periods_fails() {
    assert_eq!(TimeNavigator::new(Vec::new()), Err(NavigationError::NoPeriods));
}

proptest! {
    #[test]
    fn rate_and_percentages_stay_in_range(
        points in proptest::collection::vec((0i32..6, 0i32..6, 0usize..3), 0..25),
        links in proptest::collection::vec((0usize..25, 0usize..25), 0..25),
    ) {
        let clusters = ["Awareness", "Self-Regulation", "Other"];
        let nodes: Vec<RawRow> = points
            .iter()
            .enumerate()
            .map(|(i, (x, y, c))| node(&format!("n{}", i), "2024Q1", clusters[*c], *x as f64, *y as f64))
            .collect();
        let edges: Vec<RawRow> = links
            .iter()
            .map(|(a, b)| edge(&format!("n{}", a), &format!("n{}", b), "2024Q1"))
            .collect();
        let dataset = RecordStore::normalize(&nodes, &edges);
        prop_assume!(!dataset.periods().is_empty());

        let payload = SlicePayloadBuilder::default()
            .build(&dataset, &Period::new("2024Q1"))
            .unwrap();
        let stats = &payload.statistics;
        prop_assert!((0.0..=100.0).contains(&stats.co_occurrence_rate));
        prop_assert_eq!(stats.co_occurrence_rate == 0.0, stats.total_nodes == 0 || stats.connected_nodes == 0);
        if stats.total_nodes > 0 {
            let sum: f64 = stats.clusters.iter().map(|c| c.percentage_of_slice).sum();
            prop_assert!((sum - 100.0).abs() < 1e-9);
        }
    }
}
