//! Breadth-first level assignment and even horizontal spread.

use std::collections::{BTreeMap, HashMap, VecDeque};

use serde::Serialize;
use storyloom_core::ids::NodeId;
use storyloom_core::node::Node;
use tracing::debug;

use crate::config::LayoutConfig;

/// Where a node sits on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LayoutPosition {
    /// Horizontal offset from the canvas origin.
    pub x: f64,
    /// Vertical offset from the canvas origin; grows with `level`.
    pub y: f64,
    /// BFS depth from the root; unreachable nodes share one extra level.
    pub level: usize,
}

/// Lays out `nodes` from `root_id` with the default geometry.
#[must_use]
pub fn layout(nodes: &[Node], root_id: &NodeId) -> BTreeMap<NodeId, LayoutPosition> {
    layout_with(nodes, root_id, &LayoutConfig::default())
}

/// Lays out `nodes` from `root_id`.
///
/// Each node gets the level at which the traversal first discovers it.
/// Nodes the traversal never reaches are placed on one level below the
/// deepest reached one. Within a level nodes keep their input order. When
/// `root_id` is not among the nodes the first node is used instead. If an
/// id appears twice the first occurrence wins.
#[must_use]
pub fn layout_with(
    nodes: &[Node],
    root_id: &NodeId,
    config: &LayoutConfig,
) -> BTreeMap<NodeId, LayoutPosition> {
    let mut index: HashMap<&NodeId, usize> = HashMap::with_capacity(nodes.len());
    for (i, node) in nodes.iter().enumerate() {
        index.entry(&node.id).or_insert(i);
    }

    let root = match index.get(root_id) {
        Some(&i) => i,
        None => {
            let Some(first) = nodes.first() else {
                return BTreeMap::new();
            };
            debug!(%root_id, fallback = %first.id, "layout root missing; using first node");
            0
        }
    };

    let mut levels: Vec<Option<usize>> = vec![None; nodes.len()];
    levels[root] = Some(0);
    let mut queue = VecDeque::from([root]);
    while let Some(current) = queue.pop_front() {
        let next_level = levels[current].map_or(0, |l| l + 1);
        for child in &nodes[current].children {
            let Some(&c) = index.get(child) else {
                continue;
            };
            if levels[c].is_none() {
                levels[c] = Some(next_level);
                queue.push_back(c);
            }
        }
    }

    let orphan_level = levels.iter().flatten().max().map_or(0, |deepest| deepest + 1);
    let mut rows: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for &i in index.values() {
        rows.entry(levels[i].unwrap_or(orphan_level)).or_default().push(i);
    }

    let mut positions = BTreeMap::new();
    for (level, mut members) in rows {
        members.sort_unstable();
        let xs = spread(members.len(), config);
        #[allow(clippy::cast_precision_loss)]
        let y = config.header_offset + level as f64 * config.row_height;
        for (i, x) in members.into_iter().zip(xs) {
            positions.insert(nodes[i].id.clone(), LayoutPosition { x, y, level });
        }
    }
    positions
}

/// Evenly spaced `x` coordinates for `count` nodes centred on the canvas.
#[allow(clippy::cast_precision_loss)]
fn spread(count: usize, config: &LayoutConfig) -> Vec<f64> {
    let n = count as f64;
    let width = config.min_level_width.max(n * config.node_spacing);
    let start = config.center_x - width / 2.0;
    let gap = width / (n + 1.0);
    (1..=count).map(|slot| start + gap * slot as f64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use storyloom_core::node::Choice;

    fn diamond() -> Vec<Node> {
        vec![
            Node::new("A")
                .with_choice(Choice::to("left", "B"))
                .with_choice(Choice::to("right", "C")),
            Node::new("B").with_next("D"),
            Node::new("C").with_next("D"),
            Node::new("D").with_choice(Choice::exit("The End")),
        ]
    }

    #[test]
    fn test_empty_input_yields_empty_map() {
        assert!(layout(&[], &NodeId::from("A")).is_empty());
    }

    #[test]
    fn test_single_node_sits_at_canvas_centre() {
        let positions = layout(&[Node::new("A")], &NodeId::from("A"));

        let a = positions[&NodeId::from("A")];
        assert_eq!(a, LayoutPosition { x: 1000.0, y: 100.0, level: 0 });
    }

    #[test]
    fn test_levels_follow_first_discovery() {
        // Arrange
        let nodes = diamond();

        // Act
        let positions = layout(&nodes, &NodeId::from("A"));

        // Assert
        let level = |id: &str| positions[&NodeId::from(id)].level;
        assert_eq!((level("A"), level("B"), level("C"), level("D")), (0, 1, 1, 2));
        assert_eq!(positions[&NodeId::from("D")].y, 100.0 + 2.0 * 180.0);
    }

    #[test]
    fn test_two_node_level_divides_minimum_width() {
        let positions = layout(&diamond(), &NodeId::from("A"));

        // 800 wide starting at 600, gap 800 / 3.
        let b = positions[&NodeId::from("B")].x;
        let c = positions[&NodeId::from("C")].x;
        assert!((b - (600.0 + 800.0 / 3.0)).abs() < 1e-9);
        assert!((c - (600.0 + 1600.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn test_wide_level_grows_past_minimum() {
        let mut root = Node::new("root");
        let mut nodes = Vec::new();
        for i in 0..8 {
            let id = format!("n{i}");
            root = root.with_choice(Choice::to(id.clone(), id.as_str()));
            nodes.push(Node::new(id));
        }
        nodes.insert(0, root);

        let positions = layout(&nodes, &NodeId::from("root"));

        // 8 nodes need 1200, so the level starts at 400 with gap 1200 / 9.
        let first = positions[&NodeId::from("n0")].x;
        assert!((first - (400.0 + 1200.0 / 9.0)).abs() < 1e-9);
    }

    #[test]
    fn test_missing_root_falls_back_to_first_node() {
        let positions = layout(&diamond(), &NodeId::from("nowhere"));

        assert_eq!(positions[&NodeId::from("A")].level, 0);
        assert_eq!(positions.len(), 4);
    }

    #[test]
    fn test_duplicate_ids_keep_first_occurrence() {
        let mut nodes = diamond();
        nodes.push(Node::new("B"));

        let positions = layout(&nodes, &NodeId::from("A"));

        assert_eq!(positions.len(), 4);
        assert_eq!(positions[&NodeId::from("B")].level, 1);
    }

    #[test]
    fn test_children_outside_the_list_are_ignored() {
        let a = Node::new("A").with_next("ghost");

        let positions = layout(&[a], &NodeId::from("A"));

        assert_eq!(positions.len(), 1);
    }
}
