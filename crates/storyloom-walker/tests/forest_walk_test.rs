//! End-to-end walks through the forest stories.

use std::collections::BTreeSet;
use std::sync::Arc;

use storyloom_core::ids::{NodeId, StoryId};
use storyloom_core::source::StoryContext;
use storyloom_ledger::{LedgerConfig, ProgressLedger};
use storyloom_resolver::NodeResolver;
use storyloom_resolver::sources::EmbeddedSource;
use storyloom_resolver::sources::embedded::BUNDLED_STORY_ID;
use storyloom_store::MemoryKeyValueStore;
use storyloom_test_support::{
    FOREST_STORY, FixedClock, InMemoryNodeSource, forest_nodes, init_test_tracing,
};
use storyloom_walker::{ChoiceOutcome, GraphWalker, Step};
use uuid::Uuid;

fn ledger() -> ProgressLedger {
    ProgressLedger::open(
        Uuid::new_v4(),
        Arc::new(MemoryKeyValueStore::new()),
        Arc::new(FixedClock::pinned()),
        LedgerConfig::default(),
    )
    .unwrap()
}

fn advanced(outcome: ChoiceOutcome) -> Step {
    match outcome {
        ChoiceOutcome::Advanced(step) => step,
        ChoiceOutcome::Exited => panic!("expected the choice to advance"),
    }
}

fn visited(ledger: &ProgressLedger, story: &str) -> BTreeSet<NodeId> {
    ledger
        .snapshot()
        .unwrap()
        .visited_nodes
        .get(&StoryId::from(story))
        .cloned()
        .unwrap_or_default()
}

#[tokio::test]
async fn test_forest_two_routes_then_rewind() {
    init_test_tracing();

    // Arrange
    let resolver = NodeResolver::new(vec![Arc::new(InMemoryNodeSource::new(
        "memory",
        forest_nodes(),
    ))]);
    let ledger = ledger();
    let mut walker = GraphWalker::new(
        StoryContext::new(FOREST_STORY),
        Arc::new(resolver),
        ledger.clone(),
    );

    // Act: A -> B -> D
    let a = walker.begin().await.unwrap();
    let b = advanced(walker.choose(0).await.unwrap());
    let d = walker.continue_linear().await.unwrap();

    // Assert
    assert_eq!(a.choices.len(), 2);
    assert_eq!((a.points_awarded, b.points_awarded, d.points_awarded), (5, 5, 5));
    assert!(d.is_terminal);
    let first = d.route.unwrap();
    assert_eq!(first.route_bonus, 30);
    assert_eq!(first.completion_bonus, 80);
    assert_eq!(ledger.points().unwrap(), 500 + 15 + 30 + 80);

    // Act: rewind to A, then A -> C -> D
    let back = walker.rewind(&NodeId::from("A")).await.unwrap();
    let c = advanced(walker.choose(1).await.unwrap());
    let d_again = walker.continue_linear().await.unwrap();

    // Assert
    assert_eq!(back.points_awarded, 0);
    assert_eq!(c.node.id, NodeId::from("C"));
    assert_eq!(c.points_awarded, 5);
    assert_eq!(d_again.points_awarded, 0);
    let second = d_again.route.unwrap();
    assert_eq!(second.route_bonus, 30);
    assert_eq!(second.completion_bonus, 0);
    assert!(!second.newly_unlocked);
    assert_eq!(
        visited(&ledger, FOREST_STORY),
        ["A", "B", "C", "D"]
            .into_iter()
            .map(NodeId::from)
            .collect::<BTreeSet<_>>()
    );
    assert_eq!(ledger.points().unwrap(), 500 + 15 + 30 + 80 + 5 + 30);
    assert_eq!(walker.history().distinct_len(), 3);
}

#[tokio::test]
async fn test_bundled_manifest_walk_to_shared_ending() {
    init_test_tracing();

    // Arrange
    let resolver = NodeResolver::new(vec![Arc::new(EmbeddedSource::bundled().unwrap())]);
    let mut walker = GraphWalker::new(
        StoryContext::new(BUNDLED_STORY_ID),
        Arc::new(resolver),
        ledger(),
    );

    // Act
    let start = walker.begin().await.unwrap();
    walker.continue_linear().await.unwrap();
    let fork = walker.continue_linear().await.unwrap();
    let river = advanced(walker.choose(0).await.unwrap());
    let shallows = walker.continue_linear().await.unwrap();
    let clearing = advanced(walker.choose(0).await.unwrap());
    let end = advanced(walker.choose(0).await.unwrap());

    // Assert
    assert_eq!(start.node.id.as_str(), "scene_01_p1_d0");
    assert_eq!(fork.choices.len(), 2);
    assert_eq!(river.node.id.as_str(), "scene_02a_river_p1_d0");
    assert!(walker.state().has_item("silver_key"));
    assert!(!shallows.is_terminal);
    assert_eq!(clearing.node.id.as_str(), "scene_03_p3_d0");
    assert!(!clearing.is_terminal);
    assert!(end.is_terminal);
    let reward = end.route.unwrap();
    assert_eq!(reward.route_bonus, 70);
    assert_eq!(reward.completion_bonus, 160);
    assert_eq!(walker.choose(0).await.unwrap(), ChoiceOutcome::Exited);
}
