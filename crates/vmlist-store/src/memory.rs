use std::collections::HashMap;
use std::sync::Arc;

use vmlist_core::{EntityId, EntitySnapshot};

use crate::traits::EntityStore;

/// In-memory store scoped to one list view. No locking: the view is driven
/// from a single thread, one event at a time.
#[derive(Default, Debug)]
pub struct InMemoryEntityStore {
    entries: HashMap<EntityId, Arc<EntitySnapshot>>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> impl Iterator<Item = &EntityId> {
        self.entries.keys()
    }
}

impl EntityStore for InMemoryEntityStore {
    fn get(&self, id: &EntityId) -> Option<Arc<EntitySnapshot>> {
        self.entries.get(id).cloned()
    }

    fn put(&mut self, snapshot: EntitySnapshot) -> Arc<EntitySnapshot> {
        let snapshot = Arc::new(snapshot);
        self.entries.insert(snapshot.id.clone(), Arc::clone(&snapshot));
        snapshot
    }

    fn remove(&mut self, id: &EntityId) -> bool {
        self.entries.remove(id).is_some()
    }

    fn contains(&self, id: &EntityId) -> bool {
        self.entries.contains_key(id)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}
