//! Integration tests for story map layout.

use std::collections::BTreeSet;

use storyloom_core::ids::NodeId;
use storyloom_core::node::{Choice, Node};
use storyloom_layout::{LayoutConfig, NodeStatus, classify_nodes, layout, layout_with};
use storyloom_test_support::forest_nodes;

fn forest_with_orphans() -> Vec<Node> {
    let mut nodes = forest_nodes();
    nodes.push(Node::new("lost").with_next("found"));
    nodes.push(Node::new("found").with_choice(Choice::exit("Leave")));
    nodes
}

// --- determinism ---

#[test]
fn test_layout_is_deterministic_including_ties() {
    let nodes = forest_with_orphans();
    let root = NodeId::from("A");

    let first = layout(&nodes, &root);
    let second = layout(&nodes, &root);

    assert_eq!(first, second);
    // B and C tie on level 1; input order puts B left of C.
    assert!(first[&NodeId::from("B")].x < first[&NodeId::from("C")].x);
}

#[test]
fn test_order_within_level_follows_input_position() {
    let mut nodes = forest_nodes();
    nodes.swap(1, 2);

    let positions = layout(&nodes, &NodeId::from("A"));

    assert!(positions[&NodeId::from("C")].x < positions[&NodeId::from("B")].x);
}

// --- orphans ---

#[test]
fn test_unreachable_nodes_share_the_orphan_level() {
    // Arrange
    let nodes = forest_with_orphans();

    // Act
    let positions = layout(&nodes, &NodeId::from("A"));

    // Assert
    assert_eq!(positions.len(), nodes.len());
    let lost = positions[&NodeId::from("lost")];
    let found = positions[&NodeId::from("found")];
    assert_eq!(lost.level, 3);
    assert_eq!(found.level, 3);
    assert!(lost.x < found.x);
}

// --- geometry ---

#[test]
fn test_custom_geometry_is_honoured() {
    let config = LayoutConfig {
        center_x: 0.0,
        min_level_width: 100.0,
        node_spacing: 10.0,
        header_offset: 0.0,
        row_height: 50.0,
    };

    let positions = layout_with(&forest_nodes(), &NodeId::from("A"), &config);

    let d = positions[&NodeId::from("D")];
    assert_eq!(d.level, 2);
    assert!((d.y - 100.0).abs() < f64::EPSILON);
    assert!(d.x.abs() < f64::EPSILON);
}

// --- status ---

#[test]
fn test_map_after_first_route() {
    let nodes = forest_nodes();
    let visited: BTreeSet<NodeId> = ["A", "B", "D"].into_iter().map(NodeId::from).collect();

    let statuses = classify_nodes(&nodes, &visited, Some(&NodeId::from("D")));

    assert_eq!(statuses[&NodeId::from("D")], NodeStatus::Current);
    assert_eq!(statuses[&NodeId::from("B")], NodeStatus::Visited);
    assert_eq!(statuses[&NodeId::from("C")], NodeStatus::Available);
}
