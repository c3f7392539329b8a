use std::sync::Arc;

use indexmap::IndexSet;
use thiserror::Error;
use tracing::debug;
use vmlist_core::{EntityId, EntitySnapshot, FeedKind};
use vmlist_store::EntityStore;
use vmlist_transport::{FeedMessage, Transport};

use crate::selection::SelectionEngine;

/// Ids visible in the list, in presentation order, without duplicates.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrackedList {
    ids: IndexSet<EntityId>,
}

impl TrackedList {
    /// Appends `id`; returns false if it was already tracked.
    pub fn push(&mut self, id: EntityId) -> bool {
        self.ids.insert(id)
    }

    /// Removes `id` keeping the order of the rest; returns false if absent.
    pub fn remove(&mut self, id: &EntityId) -> bool {
        self.ids.shift_remove(id)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.ids.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityId> {
        self.ids.iter()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn to_vec(&self) -> Vec<EntityId> {
        self.ids.iter().cloned().collect()
    }
}

/// What one feed event did to the list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Applied {
    /// A new id joined the tracked list.
    Tracked,
    /// A tracked id had its derived sets recomputed.
    Updated,
    /// A tracked id left the list.
    Removed,
    /// Event for an id that is not tracked; nothing to do.
    Stale,
    /// The snapshot needed for the event could not be found.
    LookupMiss,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("{0} is in a derived set but not in the tracked list")]
    UntrackedMember(EntityId),
    #[error("store holds {stored} snapshots for {tracked} tracked ids")]
    StoreOutgrewList { stored: usize, tracked: usize },
}

/// Tracked list, entity store and derived sets of one list view, kept in
/// step by feed events. Events are applied one at a time, in arrival order.
#[derive(Debug)]
pub struct ListState<S: EntityStore> {
    store: S,
    tracked: TrackedList,
    selection: SelectionEngine,
}

impl<S: EntityStore> ListState<S> {
    pub fn new(store: S, selection: SelectionEngine) -> Self {
        Self {
            store,
            tracked: TrackedList::default(),
            selection,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn tracked(&self) -> &TrackedList {
        &self.tracked
    }

    pub fn selection(&self) -> &SelectionEngine {
        &self.selection
    }

    pub fn snapshot(&self, id: &EntityId) -> Option<Arc<EntitySnapshot>> {
        self.store.get(id)
    }

    /// Load the initial list. Duplicate ids keep their first position and
    /// their last snapshot.
    pub fn seed(&mut self, snapshots: impl IntoIterator<Item = EntitySnapshot>) {
        for snapshot in snapshots {
            let id = snapshot.id.clone();
            let stored = self.store.put(snapshot);
            self.tracked.push(id.clone());
            self.selection.recompute(&id, Some(&*stored));
        }
        self.debug_check();
    }

    /// Apply one bare feed event. `source` resolves snapshots for `Add`.
    pub fn notify<T>(&mut self, kind: FeedKind, id: &EntityId, source: &T) -> Applied
    where
        T: Transport + ?Sized,
    {
        let applied = match kind {
            FeedKind::Add => self.on_add(id, source),
            FeedKind::Remove => self.on_remove(id),
            FeedKind::Change => self.on_change(id),
        };
        self.debug_check();
        applied
    }

    /// Apply a feed message, first writing any carried snapshot for a tracked
    /// id into the store the way the transport cache would. A redelivered
    /// `Add` for a tracked id carries the current state just like `Change`.
    pub fn ingest<T>(&mut self, msg: FeedMessage, source: &T) -> Applied
    where
        T: Transport + ?Sized,
    {
        let refreshes = matches!(msg.kind, FeedKind::Add | FeedKind::Change);
        if refreshes && self.tracked.contains(&msg.id) {
            if let Some(snapshot) = msg.snapshot {
                if snapshot.id == msg.id {
                    self.store.put(snapshot);
                }
            }
        }
        self.notify(msg.kind, &msg.id, source)
    }

    /// Mark or unmark a tracked row for the set-access action. Untracked ids
    /// are ignored.
    pub fn pick(&mut self, id: &EntityId, picked: bool) -> bool {
        if !self.tracked.contains(id) {
            return false;
        }
        let snapshot = self.store.get(id);
        self.selection.pick(id, picked, snapshot.as_deref());
        self.debug_check();
        true
    }

    fn on_add<T>(&mut self, id: &EntityId, source: &T) -> Applied
    where
        T: Transport + ?Sized,
    {
        if self.tracked.contains(id) {
            return self.on_change(id);
        }
        let Some(snapshot) = source.read_snapshot(id) else {
            debug!(%id, "add for an entity the remote side no longer has");
            return Applied::LookupMiss;
        };
        if snapshot.id != *id {
            debug!(%id, got = %snapshot.id, "remote returned a snapshot for another id");
            return Applied::LookupMiss;
        }
        let stored = self.store.put(snapshot);
        self.tracked.push(id.clone());
        self.selection.recompute(id, Some(&*stored));
        Applied::Tracked
    }

    fn on_remove(&mut self, id: &EntityId) -> Applied {
        let was_tracked = self.tracked.remove(id);
        self.store.remove(id);
        self.selection.forget(id);
        if was_tracked {
            Applied::Removed
        } else {
            debug!(%id, "remove for an untracked entity");
            Applied::Stale
        }
    }

    fn on_change(&mut self, id: &EntityId) -> Applied {
        if !self.tracked.contains(id) {
            debug!(%id, "change for an untracked entity");
            return Applied::Stale;
        }
        match self.store.get(id) {
            Some(snapshot) => {
                self.selection.recompute(id, Some(&*snapshot));
                Applied::Updated
            }
            None => {
                debug!(%id, "tracked entity missing from the store");
                self.selection.recompute(id, None);
                Applied::LookupMiss
            }
        }
    }

    /// Every derived set is a subset of the tracked list, and the store never
    /// holds more entries than there are tracked ids.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        if let Some(id) = self.selection.referenced_ids().find(|id| !self.tracked.contains(id)) {
            return Err(InvariantViolation::UntrackedMember(id.clone()));
        }
        if self.store.len() > self.tracked.len() {
            return Err(InvariantViolation::StoreOutgrewList {
                stored: self.store.len(),
                tracked: self.tracked.len(),
            });
        }
        Ok(())
    }

    fn debug_check(&self) {
        if cfg!(debug_assertions) {
            if let Err(e) = self.check_invariants() {
                panic!("list state out of sync: {e}");
            }
        }
    }
}
