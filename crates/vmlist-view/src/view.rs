use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info};
use vmlist_core::{title_for, ActionTitle, BulkAction, DispatchReport, EligibilityKind, EntityId, EntitySnapshot, FeedKind};
use vmlist_store::InMemoryEntityStore;
use vmlist_transport::{FeedMessage, FeedSubscription, Transport};

use crate::config::Config;
use crate::dispatcher::dispatch;
use crate::reducer::{Applied, InvariantViolation, ListState, TrackedList};
use crate::selection::{RequiresAction, SelectionEngine};

/// One live list view: subscribes to the remote list, keeps the tracked list
/// and derived sets current, and turns button presses into remote calls.
pub struct ListView<T: Transport> {
    transport: T,
    feed: FeedSubscription,
    state: ListState<InMemoryEntityStore>,
}

impl<T: Transport> ListView<T> {
    /// Subscribe, then load the initial list, so nothing published in
    /// between is lost. Redelivered adds for seeded ids count as changes.
    pub fn open(transport: T, config: &Config) -> Result<Self> {
        let set_access = config.set_access_action()?;
        let feed = transport.subscribe_list().with_context(|| "subscribe to list feed")?;
        let initial = transport.fetch_list().with_context(|| "fetch initial list")?;

        let selection = SelectionEngine::new(RequiresAction(set_access));
        let mut state = ListState::new(InMemoryEntityStore::new(), selection);
        let count = initial.len();
        state.seed(initial);
        info!(count, tracked = state.tracked().len(), "list view loaded");

        Ok(Self { transport, feed, state })
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn state(&self) -> &ListState<InMemoryEntityStore> {
        &self.state
    }

    pub fn notify(&mut self, kind: FeedKind, id: &EntityId) -> Applied {
        self.state.notify(kind, id, &self.transport)
    }

    pub fn ingest(&mut self, msg: FeedMessage) -> Applied {
        self.state.ingest(msg, &self.transport)
    }

    /// Apply every feed message queued so far. Returns how many were applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Some(msg) = self.feed.try_next() {
            let result = self.state.ingest(msg, &self.transport);
            debug!(?result, "feed message applied");
            applied += 1;
        }
        applied
    }

    /// Block up to `timeout` for the next feed message, then apply it and
    /// everything queued behind it. Returns how many were applied.
    pub fn pump_wait(&mut self, timeout: Duration) -> usize {
        match self.feed.next_timeout(timeout) {
            Some(msg) => {
                let result = self.state.ingest(msg, &self.transport);
                debug!(?result, "feed message applied");
                1 + self.pump()
            }
            None => 0,
        }
    }

    pub fn tracked(&self) -> &TrackedList {
        self.state.tracked()
    }

    pub fn snapshot(&self, id: &EntityId) -> Option<Arc<EntitySnapshot>> {
        self.state.snapshot(id)
    }

    pub fn eligibility_set(&self, kind: EligibilityKind) -> &HashSet<EntityId> {
        self.state.selection().sets().get(kind)
    }

    /// Members of one eligibility set, in list order.
    pub fn eligible(&self, kind: EligibilityKind) -> Vec<EntityId> {
        self.in_list_order(self.eligibility_set(kind))
    }

    /// Entities the set-access action would apply to, in list order.
    pub fn selected_for_set_action(&self) -> Vec<EntityId> {
        self.in_list_order(self.state.selection().set_action().members())
    }

    pub fn pick(&mut self, id: &EntityId, picked: bool) -> bool {
        self.state.pick(id, picked)
    }

    pub fn title_for(&self, action: BulkAction, refs: &[EntityId]) -> ActionTitle {
        title_for(action, refs, |id| self.state.snapshot(id))
    }

    /// Button title for `action` over its current eligibility set.
    pub fn title(&self, action: BulkAction) -> ActionTitle {
        self.title_for(action, &self.eligible(action.eligibility()))
    }

    /// Dispatch `action` over its current eligibility set. Results show up
    /// in the sets only after the feed reports them.
    pub fn trigger_action(&self, action: BulkAction) -> DispatchReport {
        let refs = self.eligible(action.eligibility());
        self.dispatch_refs(action, &refs)
    }

    pub fn dispatch_refs(&self, action: BulkAction, refs: &[EntityId]) -> DispatchReport {
        dispatch(&self.transport, self.state.store(), action, refs)
    }

    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        self.state.check_invariants()
    }

    fn in_list_order(&self, set: &HashSet<EntityId>) -> Vec<EntityId> {
        self.state.tracked().iter().filter(|id| set.contains(*id)).cloned().collect()
    }
}
