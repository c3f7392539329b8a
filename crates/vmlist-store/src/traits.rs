use std::sync::Arc;

use vmlist_core::{EntityId, EntitySnapshot};

/// Normalized entity storage: one snapshot per id, last write wins.
///
/// Deliberately dumb. Mutations never trigger eligibility recomputation;
/// that is the reducer's job.
pub trait EntityStore {
    /// `None` is an expected outcome (the entity may have been removed).
    fn get(&self, id: &EntityId) -> Option<Arc<EntitySnapshot>>;

    /// Replace whatever is stored under `snapshot.id`. No field merging.
    fn put(&mut self, snapshot: EntitySnapshot) -> Arc<EntitySnapshot>;

    /// Idempotent. Returns whether an entry was removed.
    fn remove(&mut self, id: &EntityId) -> bool;

    fn contains(&self, id: &EntityId) -> bool {
        self.get(id).is_some()
    }

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&mut self);
}
