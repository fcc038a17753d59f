//! Aggregate root for the progress ledger.

use storyloom_core::aggregate::AggregateRoot;
use storyloom_core::clock::Clock;
use storyloom_core::event::EventMetadata;
use storyloom_core::ids::{NodeId, StoryId};
use uuid::Uuid;

use super::commands::{CompleteRoute, Purchase};
use super::events::{
    ChoiceRecorded, EndingUnlocked, FavoriteToggled, ItemPurchased, LedgerEvent, LedgerEventKind,
    LedgerReset, NodeVisited, PreferenceChanged, RouteCompleted, StoryCompleted,
};
use super::state::{ChoiceRecord, Preference, ProgressState};

/// Point values applied by the aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardRules {
    /// Points for the first visit of a node.
    pub visit_reward: u64,
    /// Points per distinct node of a completed route.
    pub route_bonus_per_node: u64,
    /// Points per story node when every ending is unlocked.
    pub completion_bonus_per_node: u64,
}

/// What a completed route paid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteReward {
    /// Paid on every completion.
    pub route_bonus: u64,
    /// Paid once per story; 0 otherwise.
    pub completion_bonus: u64,
    /// Whether this ending was reached for the first time.
    pub newly_unlocked: bool,
    /// Endings unlocked in the story after this completion.
    pub unlocked_count: usize,
    /// Endings the story has in total.
    pub total_endings: usize,
}

impl RouteReward {
    /// Route and completion bonus together.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.route_bonus.saturating_add(self.completion_bonus)
    }
}

/// What reaching a node paid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arrival {
    /// Visit reward; 0 for a node already seen.
    pub points_awarded: u64,
    /// Set when the node ended a route.
    pub route: Option<RouteReward>,
}

/// Why a purchase was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseRejection {
    /// The balance is below the price.
    InsufficientFunds,
    /// The item is already owned.
    AlreadyOwned,
}

/// Result of a purchase attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseOutcome {
    /// Points were spent and the item is owned.
    Purchased,
    /// Nothing changed.
    Rejected(PurchaseRejection),
}

fn points_for(count: usize, per_node: u64) -> u64 {
    u64::try_from(count)
        .unwrap_or(u64::MAX)
        .saturating_mul(per_node)
}

/// The aggregate root for one account's progress.
#[derive(Debug, Clone)]
pub struct ProgressRecord {
    state: ProgressState,
    /// Uncommitted events pending application.
    uncommitted_events: Vec<LedgerEvent>,
}

impl ProgressRecord {
    /// Creates a fresh record.
    #[must_use]
    pub fn new(account_id: Uuid, starting_points: u64) -> Self {
        Self::from_state(ProgressState::new(account_id, starting_points))
    }

    /// Wraps a loaded state.
    #[must_use]
    pub fn from_state(state: ProgressState) -> Self {
        Self {
            state,
            uncommitted_events: Vec::new(),
        }
    }

    /// The committed state.
    #[must_use]
    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    /// Returns the next sequence number for a new event.
    #[allow(clippy::cast_possible_wrap)]
    fn next_sequence_number(&self) -> i64 {
        self.state.version + self.uncommitted_events.len() as i64 + 1
    }

    fn record(&mut self, kind: LedgerEventKind, clock: &dyn Clock) {
        let event = LedgerEvent {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                event_type: kind.event_type().to_owned(),
                aggregate_id: self.state.account_id,
                sequence_number: self.next_sequence_number(),
                occurred_at: clock.now(),
            },
            kind,
        };
        self.uncommitted_events.push(event);
    }

    /// Visits a node. The first visit of a (story, node) pair produces a
    /// `NodeVisited` event and returns the reward; repeats return 0 and
    /// produce nothing.
    pub fn visit(
        &mut self,
        story_id: &StoryId,
        node_id: &NodeId,
        rules: &RewardRules,
        clock: &dyn Clock,
    ) -> u64 {
        let pending = self.uncommitted_events.iter().any(|e| {
            matches!(&e.kind, LedgerEventKind::NodeVisited(v) if v.story_id == *story_id && v.node_id == *node_id)
        });
        if pending || self.state.has_visited(story_id, node_id) {
            return 0;
        }
        self.record(
            LedgerEventKind::NodeVisited(NodeVisited {
                story_id: story_id.clone(),
                node_id: node_id.clone(),
                points_awarded: rules.visit_reward,
            }),
            clock,
        );
        rules.visit_reward
    }

    /// Records a choice and visits its target. Returns the visit reward.
    pub fn record_choice(
        &mut self,
        story_id: &StoryId,
        node_id: &NodeId,
        label: &str,
        target: Option<&NodeId>,
        rules: &RewardRules,
        clock: &dyn Clock,
    ) -> u64 {
        self.record(
            LedgerEventKind::ChoiceRecorded(ChoiceRecorded {
                story_id: story_id.clone(),
                node_id: node_id.clone(),
                label: label.to_owned(),
                target: target.cloned(),
            }),
            clock,
        );
        target.map_or(0, |target| self.visit(story_id, target, rules, clock))
    }

    /// Completes a route. The route bonus is paid every time; the completion
    /// bonus is paid once per story, when a newly unlocked ending brings the
    /// unlocked count to the story's total.
    ///
    /// `total_nodes` is the node count the completion bonus is computed from.
    pub fn complete_route(
        &mut self,
        command: &CompleteRoute,
        total_nodes: usize,
        rules: &RewardRules,
        clock: &dyn Clock,
    ) -> RouteReward {
        let story_id = &command.story_id;
        let route_bonus = points_for(command.route_length, rules.route_bonus_per_node);
        self.record(
            LedgerEventKind::RouteCompleted(RouteCompleted {
                story_id: story_id.clone(),
                ending_id: command.ending_id.clone(),
                route_length: command.route_length,
                route_bonus,
            }),
            clock,
        );

        let newly_unlocked = !self.state.has_unlocked(story_id, &command.ending_id);
        if newly_unlocked {
            self.record(
                LedgerEventKind::EndingUnlocked(EndingUnlocked {
                    story_id: story_id.clone(),
                    ending_id: command.ending_id.clone(),
                }),
                clock,
            );
        }
        let unlocked_count = self.state.unlocked_count(story_id) + usize::from(newly_unlocked);

        let mut completion_bonus = 0;
        if newly_unlocked
            && command.total_endings > 0
            && unlocked_count >= command.total_endings
            && !self.state.completed_stories.contains(story_id)
        {
            completion_bonus = points_for(total_nodes, rules.completion_bonus_per_node);
            self.record(
                LedgerEventKind::StoryCompleted(StoryCompleted {
                    story_id: story_id.clone(),
                    completion_bonus,
                }),
                clock,
            );
        }

        RouteReward {
            route_bonus,
            completion_bonus,
            newly_unlocked,
            unlocked_count,
            total_endings: command.total_endings,
        }
    }

    /// Buys a cosmetic. Ownership is checked before the balance.
    pub fn purchase(&mut self, command: &Purchase, clock: &dyn Clock) -> PurchaseOutcome {
        if self.state.is_owned(command.category, &command.item_id) {
            return PurchaseOutcome::Rejected(PurchaseRejection::AlreadyOwned);
        }
        if self.state.points < command.cost {
            return PurchaseOutcome::Rejected(PurchaseRejection::InsufficientFunds);
        }
        self.record(
            LedgerEventKind::ItemPurchased(ItemPurchased {
                category: command.category,
                item_id: command.item_id.clone(),
                cost: command.cost,
            }),
            clock,
        );
        PurchaseOutcome::Purchased
    }

    /// Changes an active cosmetic.
    pub fn set_active(&mut self, preference: Preference, clock: &dyn Clock) {
        self.record(
            LedgerEventKind::PreferenceChanged(PreferenceChanged { preference }),
            clock,
        );
    }

    /// Flips a series' favourite flag and returns the new value.
    pub fn toggle_favorite(&mut self, series_id: &str, clock: &dyn Clock) -> bool {
        let favorite = !self.state.is_favorite(series_id);
        self.record(
            LedgerEventKind::FavoriteToggled(FavoriteToggled {
                series_id: series_id.to_owned(),
                favorite,
            }),
            clock,
        );
        favorite
    }

    /// Wipes the record back to a fresh one.
    pub fn reset(&mut self, starting_points: u64, clock: &dyn Clock) {
        self.record(
            LedgerEventKind::LedgerReset(LedgerReset { starting_points }),
            clock,
        );
    }
}

impl AggregateRoot for ProgressRecord {
    type Event = LedgerEvent;

    fn aggregate_id(&self) -> Uuid {
        self.state.account_id
    }

    fn version(&self) -> i64 {
        self.state.version
    }

    fn apply(&mut self, event: &Self::Event) {
        let state = &mut self.state;
        match &event.kind {
            LedgerEventKind::NodeVisited(payload) => {
                let newly = state
                    .visited_nodes
                    .entry(payload.story_id.clone())
                    .or_default()
                    .insert(payload.node_id.clone());
                if newly {
                    state.points = state.points.saturating_add(payload.points_awarded);
                    state.stats.total_nodes_visited += 1;
                }
            }
            LedgerEventKind::ChoiceRecorded(payload) => {
                state
                    .choices
                    .entry(payload.story_id.clone())
                    .or_default()
                    .push(ChoiceRecord {
                        node_id: payload.node_id.clone(),
                        label: payload.label.clone(),
                        target: payload.target.clone(),
                        made_at: event.metadata.occurred_at,
                    });
                state.stats.total_choices_made += 1;
            }
            LedgerEventKind::RouteCompleted(payload) => {
                state.points = state.points.saturating_add(payload.route_bonus);
            }
            LedgerEventKind::EndingUnlocked(payload) => {
                state
                    .unlocked_endings
                    .entry(payload.story_id.clone())
                    .or_default()
                    .insert(payload.ending_id.clone());
            }
            LedgerEventKind::StoryCompleted(payload) => {
                if state.completed_stories.insert(payload.story_id.clone()) {
                    state.points = state.points.saturating_add(payload.completion_bonus);
                }
            }
            LedgerEventKind::ItemPurchased(payload) => {
                state.points = state.points.saturating_sub(payload.cost);
                state
                    .purchases
                    .get_mut(payload.category)
                    .insert(payload.item_id.clone());
            }
            LedgerEventKind::PreferenceChanged(payload) => {
                state.preferences.set(&payload.preference);
            }
            LedgerEventKind::FavoriteToggled(payload) => {
                if payload.favorite {
                    state.favorites.insert(payload.series_id.clone());
                } else {
                    state.favorites.remove(&payload.series_id);
                }
            }
            LedgerEventKind::LedgerReset(payload) => {
                let version = state.version;
                *state = ProgressState::new(state.account_id, payload.starting_points);
                state.version = version;
            }
        }
        state.version += 1;
        state.updated_at = Some(event.metadata.occurred_at);
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted_events
    }

    fn take_uncommitted_events(&mut self) -> Vec<Self::Event> {
        std::mem::take(&mut self.uncommitted_events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storyloom_core::event::DomainEvent;
    use storyloom_test_support::FixedClock;

    use crate::domain::events::{
        ENDING_UNLOCKED_EVENT_TYPE, NODE_VISITED_EVENT_TYPE, ROUTE_COMPLETED_EVENT_TYPE,
        STORY_COMPLETED_EVENT_TYPE,
    };
    use crate::domain::state::ItemCategory;

    const RULES: RewardRules = RewardRules {
        visit_reward: 5,
        route_bonus_per_node: 10,
        completion_bonus_per_node: 20,
    };

    fn forest() -> StoryId {
        StoryId::from("forest")
    }

    fn complete(ending: &str, route_length: usize) -> CompleteRoute {
        CompleteRoute {
            story_id: forest(),
            ending_id: NodeId::from(ending),
            route_length,
            total_endings: 1,
            total_nodes: Some(4),
        }
    }

    #[test]
    fn test_visit_produces_node_visited_event_once() {
        // Arrange
        let account_id = Uuid::new_v4();
        let clock = FixedClock::pinned();
        let mut record = ProgressRecord::new(account_id, 500);

        // Act
        let first = record.visit(&forest(), &NodeId::from("A"), &RULES, &clock);
        let same_batch = record.visit(&forest(), &NodeId::from("A"), &RULES, &clock);
        record.commit();
        let after_commit = record.visit(&forest(), &NodeId::from("A"), &RULES, &clock);

        // Assert
        assert_eq!((first, same_batch, after_commit), (5, 0, 0));
        assert!(record.uncommitted_events().is_empty());
        assert_eq!(record.state().points, 505);
        assert_eq!(record.state().version, 1);
        assert_eq!(record.state().updated_at, Some(clock.0));
        assert_eq!(record.state().stats.total_nodes_visited, 1);
    }

    #[test]
    fn test_event_metadata_is_sequenced() {
        let account_id = Uuid::new_v4();
        let clock = FixedClock::pinned();
        let mut record = ProgressRecord::new(account_id, 500);

        record.visit(&forest(), &NodeId::from("A"), &RULES, &clock);
        record.visit(&forest(), &NodeId::from("B"), &RULES, &clock);

        let events = record.uncommitted_events();
        assert_eq!(events[0].event_type(), NODE_VISITED_EVENT_TYPE);
        assert_eq!(events[0].metadata().aggregate_id, account_id);
        assert_eq!(events[0].metadata().sequence_number, 1);
        assert_eq!(events[1].metadata().sequence_number, 2);
        assert_eq!(events[1].metadata().occurred_at, clock.0);
    }

    #[test]
    fn test_first_completion_unlocks_and_pays_completion_bonus() {
        // Arrange
        let clock = FixedClock::pinned();
        let mut record = ProgressRecord::new(Uuid::new_v4(), 0);

        // Act
        let reward = record.complete_route(&complete("D", 3), 4, &RULES, &clock);

        // Assert
        let types: Vec<&str> = record
            .uncommitted_events()
            .iter()
            .map(DomainEvent::event_type)
            .collect();
        assert_eq!(
            types,
            vec![
                ROUTE_COMPLETED_EVENT_TYPE,
                ENDING_UNLOCKED_EVENT_TYPE,
                STORY_COMPLETED_EVENT_TYPE
            ]
        );
        assert_eq!(
            reward,
            RouteReward {
                route_bonus: 30,
                completion_bonus: 80,
                newly_unlocked: true,
                unlocked_count: 1,
                total_endings: 1,
            }
        );
        record.commit();
        assert_eq!(record.state().points, 110);
    }

    #[test]
    fn test_repeat_completion_pays_route_bonus_only() {
        let clock = FixedClock::pinned();
        let mut record = ProgressRecord::new(Uuid::new_v4(), 0);
        record.complete_route(&complete("D", 3), 4, &RULES, &clock);
        record.commit();

        let reward = record.complete_route(&complete("D", 2), 4, &RULES, &clock);
        record.commit();

        assert_eq!(reward.route_bonus, 20);
        assert_eq!(reward.completion_bonus, 0);
        assert!(!reward.newly_unlocked);
        assert_eq!(record.state().points, 130);
    }

    #[test]
    fn test_completion_waits_for_every_ending() {
        let clock = FixedClock::pinned();
        let mut record = ProgressRecord::new(Uuid::new_v4(), 0);
        let two_endings = |ending: &str| CompleteRoute {
            total_endings: 2,
            ..complete(ending, 1)
        };

        let first = record.complete_route(&two_endings("good"), 10, &RULES, &clock);
        record.commit();
        let second = record.complete_route(&two_endings("bad"), 10, &RULES, &clock);
        record.commit();

        assert_eq!(first.completion_bonus, 0);
        assert_eq!(second.completion_bonus, 200);
        assert_eq!(second.unlocked_count, 2);
    }

    #[test]
    fn test_unknown_total_endings_never_completes() {
        let clock = FixedClock::pinned();
        let mut record = ProgressRecord::new(Uuid::new_v4(), 0);

        let reward = record.complete_route(
            &CompleteRoute {
                total_endings: 0,
                ..complete("D", 1)
            },
            4,
            &RULES,
            &clock,
        );

        assert_eq!(reward.completion_bonus, 0);
        assert!(reward.newly_unlocked);
    }

    #[test]
    fn test_purchase_checks_ownership_before_balance() {
        // Arrange
        let clock = FixedClock::pinned();
        let mut record = ProgressRecord::new(Uuid::new_v4(), 100);
        let noir = Purchase {
            category: ItemCategory::Themes,
            item_id: "noir".to_owned(),
            cost: 80,
        };

        // Act
        let bought = record.purchase(&noir, &clock);
        record.commit();
        let again = record.purchase(&noir, &clock);
        let default_theme = record.purchase(
            &Purchase {
                item_id: "default".to_owned(),
                cost: 1_000,
                ..noir.clone()
            },
            &clock,
        );
        let too_expensive = record.purchase(
            &Purchase {
                item_id: "sepia".to_owned(),
                ..noir.clone()
            },
            &clock,
        );

        // Assert
        assert_eq!(bought, PurchaseOutcome::Purchased);
        assert_eq!(again, PurchaseOutcome::Rejected(PurchaseRejection::AlreadyOwned));
        assert_eq!(
            default_theme,
            PurchaseOutcome::Rejected(PurchaseRejection::AlreadyOwned)
        );
        assert_eq!(
            too_expensive,
            PurchaseOutcome::Rejected(PurchaseRejection::InsufficientFunds)
        );
        assert!(record.uncommitted_events().is_empty());
        assert_eq!(record.state().points, 20);
        assert!(record.state().is_owned(ItemCategory::Themes, "noir"));
    }

    #[test]
    fn test_record_choice_visits_target_and_counts() {
        let clock = FixedClock::pinned();
        let mut record = ProgressRecord::new(Uuid::new_v4(), 0);

        let awarded = record.record_choice(
            &forest(),
            &NodeId::from("A"),
            "Left",
            Some(&NodeId::from("B")),
            &RULES,
            &clock,
        );
        let exit = record.record_choice(&forest(), &NodeId::from("D"), "The End", None, &RULES, &clock);
        record.commit();

        assert_eq!((awarded, exit), (5, 0));
        let state = record.state();
        assert_eq!(state.stats.total_choices_made, 2);
        assert!(state.has_visited(&forest(), &NodeId::from("B")));
        let history = &state.choices[&forest()];
        assert_eq!(history[0].label, "Left");
        assert_eq!(history[0].made_at, clock.0);
        assert_eq!(history[1].target, None);
    }

    #[test]
    fn test_toggle_favorite_and_preferences() {
        let clock = FixedClock::pinned();
        let mut record = ProgressRecord::new(Uuid::new_v4(), 0);

        let on = record.toggle_favorite("series-1", &clock);
        record.commit();
        let off = record.toggle_favorite("series-1", &clock);
        record.set_active(Preference::FontSize(120), &clock);
        record.commit();

        assert!(on);
        assert!(!off);
        assert!(!record.state().is_favorite("series-1"));
        assert_eq!(record.state().preferences.font_size, 120);
    }

    #[test]
    fn test_reset_restores_fresh_record_and_keeps_version_moving() {
        let clock = FixedClock::pinned();
        let account_id = Uuid::new_v4();
        let mut record = ProgressRecord::new(account_id, 500);
        record.visit(&forest(), &NodeId::from("A"), &RULES, &clock);
        record.commit();

        record.reset(500, &clock);
        record.commit();

        let state = record.state();
        assert_eq!(state.account_id, account_id);
        assert_eq!(state.points, 500);
        assert_eq!(state.visited_count(&forest()), 0);
        assert_eq!(state.version, 2);
    }
}
