//! The shared, persisted ledger handle.
//!
//! Every mutation runs under one mutex: the aggregate records events, they
//! are committed, and the whole document is written through to the store
//! before the lock is released. Subscribers are notified afterwards.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use storyloom_core::aggregate::AggregateRoot;
use storyloom_core::clock::{Clock, SharedClock};
use storyloom_core::command::Command;
use storyloom_core::error::DomainError;
use storyloom_core::ids::{NodeId, StoryId};
use storyloom_core::store::KeyValueStore;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::LedgerConfig;
use crate::domain::aggregates::{Arrival, ProgressRecord, PurchaseOutcome, RouteReward};
use crate::domain::commands::{Arrive, CompleteRoute, Purchase};
use crate::domain::events::LedgerEvent;
use crate::domain::state::{ItemCategory, Preference, ProgressState};

/// Store key of an account's progress document.
#[must_use]
pub fn storage_key(account_id: Uuid) -> String {
    format!("storyloom.progress.{account_id}")
}

/// What subscribers receive after each successful mutation.
#[derive(Debug, Clone)]
pub struct LedgerUpdate {
    /// State after the mutation.
    pub snapshot: Arc<ProgressState>,
    /// Events the mutation applied, in order.
    pub events: Vec<LedgerEvent>,
}

/// Handle returned by [`ProgressLedger::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Arc<dyn Fn(&LedgerUpdate) + Send + Sync>;

#[derive(Clone, Copy)]
enum Persistence {
    Write,
    Remove,
}

struct Inner {
    record: ProgressRecord,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

/// Cloneable handle to one account's progress. Clones share state.
#[derive(Clone)]
pub struct ProgressLedger {
    account_id: Uuid,
    store: Arc<dyn KeyValueStore>,
    clock: SharedClock,
    config: LedgerConfig,
    inner: Arc<Mutex<Inner>>,
}

impl fmt::Debug for ProgressLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressLedger")
            .field("account_id", &self.account_id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ProgressLedger {
    /// Opens the ledger of `account_id`, loading its persisted document.
    /// A missing, corrupt or foreign document yields a fresh record.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the store cannot be read.
    /// The stored document is left untouched so a later open can recover it.
    pub fn open(
        account_id: Uuid,
        store: Arc<dyn KeyValueStore>,
        clock: SharedClock,
        config: LedgerConfig,
    ) -> Result<Self, DomainError> {
        let record = load(account_id, store.as_ref(), &config)?;
        Ok(Self {
            account_id,
            store,
            clock,
            config,
            inner: Arc::new(Mutex::new(Inner {
                record,
                subscribers: Vec::new(),
                next_subscription: 0,
            })),
        })
    }

    /// The account this ledger belongs to.
    #[must_use]
    pub fn account_id(&self) -> Uuid {
        self.account_id
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, DomainError> {
        self.inner
            .lock()
            .map_err(|_| DomainError::Infrastructure("ledger lock poisoned".into()))
    }

    /// Runs `op` against the record, commits, persists and notifies. When
    /// nothing was recorded the store and subscribers are left alone. A
    /// failed write rolls the record back.
    fn mutate<T>(
        &self,
        persistence: Persistence,
        op: impl FnOnce(&mut ProgressRecord, &dyn Clock) -> T,
    ) -> Result<T, DomainError> {
        let (value, update, subscribers) = {
            let mut inner = self.lock()?;
            let before = inner.record.state().clone();
            let value = op(&mut inner.record, self.clock.as_ref());
            let events = inner.record.commit();
            if events.is_empty() {
                return Ok(value);
            }
            if let Err(err) = self.persist(inner.record.state(), persistence) {
                inner.record = ProgressRecord::from_state(before);
                return Err(err);
            }
            let update = LedgerUpdate {
                snapshot: Arc::new(inner.record.state().clone()),
                events,
            };
            let subscribers: Vec<Subscriber> =
                inner.subscribers.iter().map(|(_, s)| Arc::clone(s)).collect();
            (value, update, subscribers)
        };

        for subscriber in subscribers {
            subscriber(&update);
        }
        Ok(value)
    }

    fn persist(&self, state: &ProgressState, persistence: Persistence) -> Result<(), DomainError> {
        let key = storage_key(self.account_id);
        match persistence {
            Persistence::Write => {
                let document = serde_json::to_string(state).map_err(|e| {
                    DomainError::Infrastructure(format!("progress serialization failed: {e}"))
                })?;
                self.store.put(&key, &document)
            }
            Persistence::Remove => self.store.remove(&key),
        }
    }

    fn read<T>(&self, f: impl FnOnce(&ProgressState) -> T) -> Result<T, DomainError> {
        Ok(f(self.lock()?.record.state()))
    }

    /// Records a visit. Returns the points granted: the visit reward the
    /// first time the pair is seen, 0 afterwards.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the record cannot be
    /// persisted.
    pub fn visit(&self, story_id: &StoryId, node_id: &NodeId) -> Result<u64, DomainError> {
        let rules = self.config.rules();
        let awarded = self.mutate(Persistence::Write, |record, clock| {
            record.visit(story_id, node_id, &rules, clock)
        })?;
        if awarded > 0 {
            debug!(%story_id, %node_id, awarded, "node visited");
        }
        Ok(awarded)
    }

    /// Records a choice and visits its target. Returns the visit reward.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the record cannot be
    /// persisted.
    pub fn record_choice(
        &self,
        story_id: &StoryId,
        node_id: &NodeId,
        label: &str,
        target: Option<&NodeId>,
    ) -> Result<u64, DomainError> {
        let rules = self.config.rules();
        self.mutate(Persistence::Write, |record, clock| {
            record.record_choice(story_id, node_id, label, target, &rules, clock)
        })
    }

    /// Records a completed route.
    ///
    /// Without `total_nodes` the completion bonus falls back to the number
    /// of nodes visited in the story.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the record cannot be
    /// persisted.
    pub fn complete_route(&self, command: &CompleteRoute) -> Result<RouteReward, DomainError> {
        let rules = self.config.rules();
        let reward = self.mutate(Persistence::Write, |record, clock| {
            let total_nodes = total_nodes_or_visited(record, command, 0);
            record.complete_route(command, total_nodes, &rules, clock)
        })?;
        log_route(command, &reward);
        Ok(reward)
    }

    /// Records the choice, the visit and the route completion of
    /// `command` in one mutation, so either all of them are persisted or
    /// none is.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the record cannot be
    /// persisted.
    pub fn arrive(&self, command: &Arrive) -> Result<Arrival, DomainError> {
        let rules = self.config.rules();
        let arrival = self.mutate(Persistence::Write, |record, clock| {
            let points_awarded = match &command.via {
                Some((from, label)) => record.record_choice(
                    &command.story_id,
                    from,
                    label,
                    Some(&command.node_id),
                    &rules,
                    clock,
                ),
                None => record.visit(&command.story_id, &command.node_id, &rules, clock),
            };
            let route = command.route.as_ref().map(|route| {
                let total_nodes =
                    total_nodes_or_visited(record, route, usize::from(points_awarded > 0));
                record.complete_route(route, total_nodes, &rules, clock)
            });
            Arrival {
                points_awarded,
                route,
            }
        })?;
        debug!(
            command = command.command_type(),
            story_id = %command.story_id,
            node_id = %command.node_id,
            points_awarded = arrival.points_awarded,
            "node reached"
        );
        if let (Some(route), Some(reward)) = (&command.route, &arrival.route) {
            log_route(route, reward);
        }
        Ok(arrival)
    }

    /// Buys a cosmetic.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the record cannot be
    /// persisted.
    pub fn purchase(&self, command: &Purchase) -> Result<PurchaseOutcome, DomainError> {
        let outcome = self.mutate(Persistence::Write, |record, clock| {
            record.purchase(command, clock)
        })?;
        debug!(
            command = command.command_type(),
            category = ?command.category,
            item_id = %command.item_id,
            ?outcome,
            "purchase handled"
        );
        Ok(outcome)
    }

    /// Changes an active cosmetic. Does not touch points.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the record cannot be
    /// persisted.
    pub fn set_active(&self, preference: Preference) -> Result<(), DomainError> {
        self.mutate(Persistence::Write, |record, clock| {
            record.set_active(preference, clock);
        })
    }

    /// Flips a series' favourite flag and returns the new value.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the record cannot be
    /// persisted.
    pub fn toggle_favorite(&self, series_id: &str) -> Result<bool, DomainError> {
        self.mutate(Persistence::Write, |record, clock| {
            record.toggle_favorite(series_id, clock)
        })
    }

    /// Wipes all progress and deletes the persisted document.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the document cannot be
    /// removed.
    pub fn reset(&self) -> Result<(), DomainError> {
        let starting_points = self.config.starting_points;
        self.mutate(Persistence::Remove, |record, clock| {
            record.reset(starting_points, clock);
        })?;
        info!(account_id = %self.account_id, "progress reset");
        Ok(())
    }

    /// Whether the item is owned.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the ledger lock is poisoned.
    pub fn is_owned(&self, category: ItemCategory, item_id: &str) -> Result<bool, DomainError> {
        self.read(|state| state.is_owned(category, item_id))
    }

    /// Whether `series_id` is a favourite.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the ledger lock is poisoned.
    pub fn is_favorite(&self, series_id: &str) -> Result<bool, DomainError> {
        self.read(|state| state.is_favorite(series_id))
    }

    /// Whether the node has been visited.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the ledger lock is poisoned.
    pub fn has_visited(&self, story_id: &StoryId, node_id: &NodeId) -> Result<bool, DomainError> {
        self.read(|state| state.has_visited(story_id, node_id))
    }

    /// Current balance.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the ledger lock is poisoned.
    pub fn points(&self) -> Result<u64, DomainError> {
        self.read(|state| state.points)
    }

    /// A copy of the whole record.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the ledger lock is poisoned.
    pub fn snapshot(&self) -> Result<ProgressState, DomainError> {
        self.read(Clone::clone)
    }

    /// Registers `subscriber` for every future successful mutation.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the ledger lock is poisoned.
    pub fn subscribe(
        &self,
        subscriber: impl Fn(&LedgerUpdate) + Send + Sync + 'static,
    ) -> Result<SubscriptionId, DomainError> {
        let mut inner = self.lock()?;
        let id = SubscriptionId(inner.next_subscription);
        inner.next_subscription += 1;
        inner.subscribers.push((id, Arc::new(subscriber)));
        Ok(id)
    }

    /// Removes a subscriber. Returns whether it was registered.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the ledger lock is poisoned.
    pub fn unsubscribe(&self, id: SubscriptionId) -> Result<bool, DomainError> {
        let mut inner = self.lock()?;
        let before = inner.subscribers.len();
        inner.subscribers.retain(|(sid, _)| *sid != id);
        Ok(inner.subscribers.len() != before)
    }
}

/// `command.total_nodes`, or the story's visited count plus `pending`
/// visits not yet committed.
fn total_nodes_or_visited(
    record: &ProgressRecord,
    command: &CompleteRoute,
    pending: usize,
) -> usize {
    command.total_nodes.unwrap_or_else(|| {
        let visited = record.state().visited_count(&command.story_id) + pending;
        warn!(
            story_id = %command.story_id,
            visited,
            "total node count unknown; completion bonus uses visited count"
        );
        visited
    })
}

fn log_route(command: &CompleteRoute, reward: &RouteReward) {
    info!(
        command = command.command_type(),
        story_id = %command.story_id,
        ending_id = %command.ending_id,
        route_bonus = reward.route_bonus,
        completion_bonus = reward.completion_bonus,
        unlocked = reward.unlocked_count,
        total_endings = reward.total_endings,
        "route completed"
    );
}

fn load(
    account_id: Uuid,
    store: &dyn KeyValueStore,
    config: &LedgerConfig,
) -> Result<ProgressRecord, DomainError> {
    let fresh = || ProgressRecord::new(account_id, config.starting_points);
    let Some(document) = store.get(&storage_key(account_id)).inspect_err(|err| {
        error!(%account_id, error = %err, "progress document unreadable");
    })?
    else {
        return Ok(fresh());
    };
    let record = match serde_json::from_str::<ProgressState>(&document) {
        Ok(state) if state.account_id == account_id => {
            debug!(%account_id, version = state.version, "progress loaded");
            ProgressRecord::from_state(state)
        }
        Ok(state) => {
            warn!(%account_id, stored = %state.account_id, "progress document belongs to another account; starting fresh");
            fresh()
        }
        Err(err) => {
            warn!(%account_id, error = %err, "progress document corrupt; starting fresh");
            fresh()
        }
    };
    Ok(record)
}
