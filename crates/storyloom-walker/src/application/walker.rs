//! Navigation over one story for one player.

use std::collections::HashMap;
use std::sync::Arc;

use storyloom_core::error::DomainError;
use storyloom_core::ids::NodeId;
use storyloom_core::node::{Choice, Node};
use storyloom_core::source::StoryContext;
use storyloom_core::state::StoryState;
use storyloom_ledger::ProgressLedger;
use storyloom_ledger::domain::commands::{Arrive, CompleteRoute};
use storyloom_resolver::NodeResolver;
use tracing::{debug, info, instrument, warn};

use crate::domain::history::WalkHistory;
use crate::domain::step::{ChoiceOutcome, Step, StoryTotals, ends_route};

/// Walks one story, reporting progress to a ledger.
///
/// Navigation methods take `&mut self`, so a walker runs at most one
/// navigation at a time. Resolved nodes, the start node id and the story
/// totals are cached for the walker's lifetime.
#[derive(Debug)]
pub struct GraphWalker {
    story: StoryContext,
    resolver: Arc<NodeResolver>,
    ledger: ProgressLedger,
    current: Option<Node>,
    choices: Vec<Choice>,
    history: WalkHistory,
    state: StoryState,
    nodes: HashMap<NodeId, Node>,
    start_id: Option<NodeId>,
    totals: Option<StoryTotals>,
}

impl GraphWalker {
    /// Creates a walker positioned nowhere. Call [`Self::begin`] or
    /// [`Self::advance`] to enter the story.
    #[must_use]
    pub fn new(story: StoryContext, resolver: Arc<NodeResolver>, ledger: ProgressLedger) -> Self {
        Self {
            story,
            resolver,
            ledger,
            current: None,
            choices: Vec::new(),
            history: WalkHistory::new(),
            state: StoryState::new(),
            nodes: HashMap::new(),
            start_id: None,
            totals: None,
        }
    }

    /// The story being walked.
    #[must_use]
    pub fn story(&self) -> &StoryContext {
        &self.story
    }

    /// The current node, `None` before the first navigation.
    #[must_use]
    pub fn current(&self) -> Option<&Node> {
        self.current.as_ref()
    }

    /// Choices of the current node that the story state allows.
    #[must_use]
    pub fn choices(&self) -> &[Choice] {
        &self.choices
    }

    /// Nodes entered in the current walk.
    #[must_use]
    pub fn history(&self) -> &WalkHistory {
        &self.history
    }

    /// Story state folded from the current walk.
    #[must_use]
    pub fn state(&self) -> &StoryState {
        &self.state
    }

    /// The ledger progress is reported to.
    #[must_use]
    pub fn ledger(&self) -> &ProgressLedger {
        &self.ledger
    }

    /// Starts a new walk at the story's start node.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::StoryNotFound` if no source knows the story,
    /// `DomainError::Transport` if a source fails, or
    /// `DomainError::Infrastructure` if the ledger cannot persist.
    #[instrument(skip(self), fields(story_id = %self.story.story_id))]
    pub async fn begin(&mut self) -> Result<Step, DomainError> {
        let start_id = match &self.start_id {
            Some(id) => id.clone(),
            None => {
                let start = self.resolver.resolve_start(&self.story).await?;
                let id = start.id.clone();
                self.nodes.insert(id.clone(), start);
                self.start_id = Some(id.clone());
                id
            }
        };

        self.current = None;
        self.choices.clear();
        self.history.clear();
        self.state = StoryState::new();
        info!(start = %start_id, "walk started");
        self.advance(&start_id).await
    }

    /// Moves to `target`: applies its consequences, records the visit and,
    /// when the node ends a route, completes the route in the ledger.
    ///
    /// A failed resolution or ledger write leaves the walker unchanged.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NodeNotFound` if no source has the node,
    /// `DomainError::Transport` if a source fails, or
    /// `DomainError::Infrastructure` if the ledger cannot persist.
    #[instrument(skip(self), fields(story_id = %self.story.story_id))]
    pub async fn advance(&mut self, target: &NodeId) -> Result<Step, DomainError> {
        self.arrive(target, None).await
    }

    /// Takes the displayable choice at `index`. The choice is recorded in
    /// the ledger together with the arrival; an exit leaves the walker
    /// where it is.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if there is no current node or the
    /// index is out of range, otherwise as [`Self::advance`].
    #[instrument(skip(self), fields(story_id = %self.story.story_id))]
    pub async fn choose(&mut self, index: usize) -> Result<ChoiceOutcome, DomainError> {
        let from = self.current_id()?;
        let choice = self.choices.get(index).cloned().ok_or_else(|| {
            DomainError::Validation(format!(
                "choice {index} out of range; {} displayable",
                self.choices.len()
            ))
        })?;

        match &choice.target {
            Some(target) if !choice.is_exit() => {
                let step = self.arrive(target, Some((from, choice.label))).await?;
                Ok(ChoiceOutcome::Advanced(step))
            }
            _ => {
                self.ledger
                    .record_choice(&self.story.story_id, &from, &choice.label, None)?;
                info!(node_id = %from, label = %choice.label, "story exited");
                Ok(ChoiceOutcome::Exited)
            }
        }
    }

    /// Follows the current node's linear successor.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if there is no current node or it
    /// has no successor, otherwise as [`Self::advance`].
    #[instrument(skip(self), fields(story_id = %self.story.story_id))]
    pub async fn continue_linear(&mut self) -> Result<Step, DomainError> {
        let next = self
            .current
            .as_ref()
            .ok_or_else(|| DomainError::Validation("walk has not started".into()))?
            .next
            .clone()
            .ok_or_else(|| DomainError::Validation("current node has no successor".into()))?;
        self.advance(&next).await
    }

    /// Returns to the most recent visit of `node_id`. History after it is
    /// dropped and the story state is rebuilt from what remains. No points
    /// are granted and no route is completed.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the node is not in the current
    /// walk, or a resolution error if a history node cannot be reloaded.
    #[instrument(skip(self), fields(story_id = %self.story.story_id))]
    pub async fn rewind(&mut self, node_id: &NodeId) -> Result<Step, DomainError> {
        let mut history = self.history.clone();
        if !history.truncate_to(node_id) {
            return Err(DomainError::Validation(format!(
                "node {node_id} is not in the current walk"
            )));
        }

        let mut walked = Vec::with_capacity(history.len());
        for id in history.entries() {
            walked.push(self.node(id).await?);
        }
        let state = StoryState::fold(&walked);
        let node = self.node(node_id).await?;
        let choices = state.displayable_choices(&node);
        let is_terminal = ends_route(&node, &choices);

        self.history = history;
        self.state = state;
        self.current = Some(node.clone());
        self.choices.clone_from(&choices);
        debug!(%node_id, depth = self.history.len(), "rewound");

        Ok(Step {
            node,
            choices,
            points_awarded: 0,
            route: None,
            is_terminal,
        })
    }

    /// Endings and node count of the story, loaded once from the full graph.
    pub async fn totals(&mut self) -> StoryTotals {
        if let Some(totals) = self.totals {
            return totals;
        }
        match self.resolver.story_graph(&self.story).await {
            Ok(graph) => {
                let totals = StoryTotals {
                    total_endings: graph.total_endings(),
                    total_nodes: Some(graph.len()),
                };
                self.totals = Some(totals);
                totals
            }
            Err(DomainError::StoryNotFound(_)) => {
                warn!(story_id = %self.story.story_id, "story graph unavailable; totals unknown");
                self.totals = Some(StoryTotals::unknown());
                StoryTotals::unknown()
            }
            Err(err) => {
                warn!(story_id = %self.story.story_id, error = %err, "story graph failed to load");
                StoryTotals::unknown()
            }
        }
    }

    /// Resolves `target` and works out the walk that reaches it, then
    /// records choice, visit and route in one ledger call. Walker fields
    /// are only replaced once that call has succeeded.
    async fn arrive(
        &mut self,
        target: &NodeId,
        via: Option<(NodeId, String)>,
    ) -> Result<Step, DomainError> {
        let node = self.node(target).await?;
        let mut state = self.state.clone();
        state.enter(&node);
        let mut history = self.history.clone();
        history.push(node.id.clone());
        let choices = state.displayable_choices(&node);
        let is_terminal = ends_route(&node, &choices);

        let route = if is_terminal {
            let totals = self.totals().await;
            Some(CompleteRoute {
                story_id: self.story.story_id.clone(),
                ending_id: node.id.clone(),
                route_length: history.distinct_len(),
                total_endings: totals.total_endings,
                total_nodes: totals.total_nodes,
            })
        } else {
            None
        };
        let arrival = self.ledger.arrive(&Arrive {
            story_id: self.story.story_id.clone(),
            node_id: node.id.clone(),
            via,
            route,
        })?;

        self.state = state;
        self.history = history;
        self.current = Some(node.clone());
        self.choices.clone_from(&choices);
        debug!(
            node_id = %node.id,
            points_awarded = arrival.points_awarded,
            is_terminal,
            "advanced"
        );

        Ok(Step {
            node,
            choices,
            points_awarded: arrival.points_awarded,
            route: arrival.route,
            is_terminal,
        })
    }

    async fn node(&mut self, id: &NodeId) -> Result<Node, DomainError> {
        if let Some(node) = self.nodes.get(id) {
            return Ok(node.clone());
        }
        let node = self.resolver.resolve(id, &self.story).await?;
        self.nodes.insert(id.clone(), node.clone());
        Ok(node)
    }

    fn current_id(&self) -> Result<NodeId, DomainError> {
        self.current
            .as_ref()
            .map(|node| node.id.clone())
            .ok_or_else(|| DomainError::Validation("walk has not started".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storyloom_core::node::{Condition, Consequence};
    use storyloom_core::source::NodeSource;
    use storyloom_core::store::KeyValueStore;
    use storyloom_ledger::LedgerConfig;
    use storyloom_store::MemoryKeyValueStore;
    use storyloom_test_support::{
        FOREST_STORY, FailingNodeSource, FixedClock, InMemoryNodeSource, RecordingKeyValueStore,
        forest_nodes,
    };
    use uuid::Uuid;

    fn ledger(store: Arc<dyn KeyValueStore>) -> ProgressLedger {
        ProgressLedger::open(
            Uuid::new_v4(),
            store,
            Arc::new(FixedClock::pinned()),
            LedgerConfig::default(),
        )
        .unwrap()
    }

    fn walker_with_store(nodes: Vec<Node>, store: Arc<dyn KeyValueStore>) -> GraphWalker {
        GraphWalker::new(
            StoryContext::new(FOREST_STORY),
            Arc::new(NodeResolver::new(vec![Arc::new(InMemoryNodeSource::new(
                "memory", nodes,
            ))])),
            ledger(store),
        )
    }

    fn walker_over(sources: Vec<Arc<dyn NodeSource>>) -> GraphWalker {
        GraphWalker::new(
            StoryContext::new(FOREST_STORY),
            Arc::new(NodeResolver::new(sources)),
            ledger(Arc::new(MemoryKeyValueStore::new())),
        )
    }

    /// `gate` offers the door only once the shed has handed out the key.
    fn shed_and_key() -> Vec<Node> {
        vec![
            Node::new("gate")
                .with_choice(
                    Choice::to("Unlock the door", "door")
                        .with_condition(Condition::RequiredItem("key".into())),
                )
                .with_choice(Choice::to("Search the shed", "shed")),
            Node::new("shed")
                .with_consequence(Consequence::AddItem("key".into()))
                .with_next("gate"),
            Node::new("door"),
        ]
    }

    #[tokio::test]
    async fn test_begin_uses_cached_start_node() {
        // Arrange
        let source = Arc::new(InMemoryNodeSource::new("memory", forest_nodes()));
        let mut walker = walker_over(vec![source.clone()]);

        // Act
        let first = walker.begin().await.unwrap();
        let again = walker.begin().await.unwrap();

        // Assert
        assert_eq!(first.node.id, NodeId::from("A"));
        assert_eq!(first.points_awarded, 5);
        assert_eq!(again.points_awarded, 0);
        assert_eq!(walker.history().entries(), &[NodeId::from("A")]);
        assert_eq!(source.resolve_calls(), 0);
    }

    #[tokio::test]
    async fn test_gated_choice_appears_once_item_is_held() {
        // Arrange
        let source = Arc::new(InMemoryNodeSource::new("memory", shed_and_key()));
        let mut walker = walker_over(vec![source]);

        // Act
        let at_gate = walker.begin().await.unwrap();
        let ChoiceOutcome::Advanced(_) = walker.choose(0).await.unwrap() else {
            panic!("expected to reach the shed");
        };
        let back = walker.continue_linear().await.unwrap();

        // Assert
        assert_eq!(at_gate.choices.len(), 1);
        assert_eq!(at_gate.choices[0].label, "Search the shed");
        assert_eq!(back.choices.len(), 2);
        assert!(walker.state().has_item("key"));
    }

    #[tokio::test]
    async fn test_rewind_refolds_state_and_grants_nothing() {
        let source = Arc::new(InMemoryNodeSource::new("memory", shed_and_key()));
        let mut walker = walker_over(vec![source]);
        walker.begin().await.unwrap();
        walker.choose(0).await.unwrap();
        walker.continue_linear().await.unwrap();
        let points_before = walker.ledger().points().unwrap();

        let step = walker.rewind(&NodeId::from("gate")).await.unwrap();

        // The most recent `gate` is kept, so the key is still held.
        assert_eq!(walker.history().len(), 3);
        assert_eq!(step.choices.len(), 2);
        assert_eq!(step.points_awarded, 0);
        assert_eq!(walker.ledger().points().unwrap(), points_before);
    }

    #[tokio::test]
    async fn test_rewind_to_first_gate_drops_the_key() {
        let source = Arc::new(InMemoryNodeSource::new("memory", shed_and_key()));
        let mut walker = walker_over(vec![source]);
        walker.begin().await.unwrap();
        walker.choose(0).await.unwrap();

        let step = walker.rewind(&NodeId::from("gate")).await.unwrap();

        assert_eq!(walker.history().len(), 1);
        assert!(!walker.state().has_item("key"));
        assert_eq!(step.choices.len(), 1);
    }

    #[tokio::test]
    async fn test_rewind_to_node_outside_walk_is_rejected() {
        let source = Arc::new(InMemoryNodeSource::new("memory", forest_nodes()));
        let mut walker = walker_over(vec![source]);
        walker.begin().await.unwrap();

        let result = walker.rewind(&NodeId::from("D")).await;

        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert_eq!(walker.current().map(|n| n.id.as_str()), Some("A"));
    }

    #[tokio::test]
    async fn test_unknown_node_is_not_found_and_leaves_walker_unchanged() {
        let source = Arc::new(InMemoryNodeSource::new("memory", forest_nodes()));
        let mut walker = walker_over(vec![source]);
        walker.begin().await.unwrap();

        let result = walker.advance(&NodeId::from("ghost")).await;

        assert!(matches!(result, Err(DomainError::NodeNotFound { .. })));
        assert_eq!(walker.history().len(), 1);
        assert_eq!(walker.current().map(|n| n.id.as_str()), Some("A"));
    }

    #[tokio::test]
    async fn test_failed_write_at_ending_leaves_walker_and_progress_unchanged() {
        // Arrange: writes 1 and 2 are A and the choice of B; D's arrival is the third.
        let store = Arc::new(RecordingKeyValueStore::new().with_failing_put(3));
        let mut walker = walker_with_store(forest_nodes(), store);
        walker.begin().await.unwrap();
        walker.choose(0).await.unwrap();

        // Act
        let result = walker.continue_linear().await;

        // Assert
        assert!(matches!(result, Err(DomainError::Infrastructure(_))));
        assert_eq!(
            walker.history().entries(),
            &[NodeId::from("A"), NodeId::from("B")]
        );
        assert_eq!(walker.current().map(|n| n.id.as_str()), Some("B"));
        assert!(walker.choices().is_empty());
        let snapshot = walker.ledger().snapshot().unwrap();
        assert_eq!(snapshot.points, 510);
        assert!(!snapshot.has_visited(&walker.story().story_id, &NodeId::from("D")));
        assert!(!snapshot.has_unlocked(&walker.story().story_id, &NodeId::from("D")));
    }

    #[tokio::test]
    async fn test_failed_write_on_choice_keeps_choice_unrecorded_and_walker_in_place() {
        // Arrange: gate, then the shed choice; returning to gate writes nothing.
        let store = Arc::new(RecordingKeyValueStore::new().with_failing_put(3));
        let mut walker = walker_with_store(shed_and_key(), store.clone());
        walker.begin().await.unwrap();
        walker.choose(0).await.unwrap();
        walker.continue_linear().await.unwrap();

        // Act
        let result = walker.choose(0).await;

        // Assert
        assert!(matches!(result, Err(DomainError::Infrastructure(_))));
        assert_eq!(walker.current().map(|n| n.id.as_str()), Some("gate"));
        assert_eq!(walker.history().len(), 3);
        assert_eq!(walker.choices().len(), 2);
        assert!(walker.state().has_item("key"));
        let snapshot = walker.ledger().snapshot().unwrap();
        assert_eq!(snapshot.stats.total_choices_made, 1);
        assert!(!snapshot.has_visited(&walker.story().story_id, &NodeId::from("door")));
        assert_eq!(store.puts().len(), 2);
    }

    #[tokio::test]
    async fn test_transport_failure_surfaces() {
        let mut walker = walker_over(vec![Arc::new(FailingNodeSource)]);

        let result = walker.begin().await;

        assert!(result.is_err_and(|e| e.is_transport()));
    }

    #[tokio::test]
    async fn test_choose_before_begin_or_out_of_range_is_rejected() {
        let source = Arc::new(InMemoryNodeSource::new("memory", forest_nodes()));
        let mut walker = walker_over(vec![source]);

        let early = walker.choose(0).await;
        walker.begin().await.unwrap();
        let wide = walker.choose(7).await;

        assert!(matches!(early, Err(DomainError::Validation(_))));
        assert!(matches!(wide, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn test_continue_linear_without_successor_is_rejected() {
        let source = Arc::new(InMemoryNodeSource::new("memory", forest_nodes()));
        let mut walker = walker_over(vec![source]);
        walker.begin().await.unwrap();

        let result = walker.continue_linear().await;

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn test_exit_choice_records_choice_and_stays_put() {
        let source = Arc::new(InMemoryNodeSource::new("memory", forest_nodes()));
        let mut walker = walker_over(vec![source]);
        walker.begin().await.unwrap();
        walker.choose(0).await.unwrap();
        walker.continue_linear().await.unwrap();

        let outcome = walker.choose(0).await.unwrap();

        assert_eq!(outcome, ChoiceOutcome::Exited);
        assert_eq!(walker.current().map(|n| n.id.as_str()), Some("D"));
        let snapshot = walker.ledger().snapshot().unwrap();
        assert_eq!(snapshot.stats.total_choices_made, 2);
    }

    #[tokio::test]
    async fn test_unknown_totals_pay_route_bonus_only() {
        // Arrange
        let source = Arc::new(InMemoryNodeSource::new("memory", forest_nodes()).without_graph());
        let mut walker = walker_over(vec![source]);

        // Act
        walker.begin().await.unwrap();
        walker.choose(1).await.unwrap();
        let end = walker.continue_linear().await.unwrap();

        // Assert
        let route = end.route.unwrap();
        assert!(end.is_terminal);
        assert_eq!(route.route_bonus, 30);
        assert_eq!(route.completion_bonus, 0);
        assert_eq!(walker.totals().await, StoryTotals::unknown());
    }
}
