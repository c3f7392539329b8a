//! Derived selection state: the five eligibility sets plus the set-access
//! selection. Membership only ever changes through [`SelectionEngine::recompute`],
//! [`SelectionEngine::pick`] and [`SelectionEngine::forget`].

use std::collections::HashSet;

use vmlist_core::{derive_all, ActionKind, Eligibility, EligibilityKind, EntityId, EntitySnapshot};

/// Decides membership in the set-access selection.
pub trait SelectionPredicate {
    fn admits(&self, snapshot: &EntitySnapshot) -> bool;
}

impl<F> SelectionPredicate for F
where
    F: Fn(&EntitySnapshot) -> bool,
{
    fn admits(&self, snapshot: &EntitySnapshot) -> bool {
        self(snapshot)
    }
}

/// Admits entities that permit one specific action.
#[derive(Clone, Copy, Debug)]
pub struct RequiresAction(pub ActionKind);

impl SelectionPredicate for RequiresAction {
    fn admits(&self, snapshot: &EntitySnapshot) -> bool {
        snapshot.permits(self.0)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EligibilitySets {
    startable: HashSet<EntityId>,
    stoppable: HashSet<EntityId>,
    pause_toggleable: HashSet<EntityId>,
    suspendable: HashSet<EntityId>,
    destroyable: HashSet<EntityId>,
}

impl EligibilitySets {
    pub fn get(&self, kind: EligibilityKind) -> &HashSet<EntityId> {
        match kind {
            EligibilityKind::Startable => &self.startable,
            EligibilityKind::Stoppable => &self.stoppable,
            EligibilityKind::PauseToggleable => &self.pause_toggleable,
            EligibilityKind::Suspendable => &self.suspendable,
            EligibilityKind::Destroyable => &self.destroyable,
        }
    }

    fn get_mut(&mut self, kind: EligibilityKind) -> &mut HashSet<EntityId> {
        match kind {
            EligibilityKind::Startable => &mut self.startable,
            EligibilityKind::Stoppable => &mut self.stoppable,
            EligibilityKind::PauseToggleable => &mut self.pause_toggleable,
            EligibilityKind::Suspendable => &mut self.suspendable,
            EligibilityKind::Destroyable => &mut self.destroyable,
        }
    }

    /// Add or remove `id` in every set according to `eligibility`.
    pub fn apply(&mut self, id: &EntityId, eligibility: Eligibility) {
        for kind in EligibilityKind::ALL {
            set_membership(self.get_mut(kind), id, eligibility.get(kind));
        }
    }

    pub fn forget(&mut self, id: &EntityId) {
        for kind in EligibilityKind::ALL {
            self.get_mut(kind).remove(id);
        }
    }

    /// Current membership of `id`, read back from the sets.
    pub fn membership(&self, id: &EntityId) -> Eligibility {
        Eligibility {
            startable: self.startable.contains(id),
            stoppable: self.stoppable.contains(id),
            destroyable: self.destroyable.contains(id),
            pause_toggleable: self.pause_toggleable.contains(id),
            suspendable: self.suspendable.contains(id),
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = &EntityId> {
        EligibilityKind::ALL.into_iter().flat_map(move |k| self.get(k).iter())
    }
}

fn set_membership(set: &mut HashSet<EntityId>, id: &EntityId, member: bool) {
    if member {
        if !set.contains(id) {
            set.insert(id.clone());
        }
    } else {
        set.remove(id);
    }
}

/// The set used by the "set access policy on selected entities" action.
///
/// Members are the rows the user picked that also pass the injected
/// predicate. Nothing is selected until something is picked.
pub struct SetActionSelection {
    predicate: Box<dyn SelectionPredicate>,
    picked: HashSet<EntityId>,
    members: HashSet<EntityId>,
}

impl SetActionSelection {
    pub fn new(predicate: impl SelectionPredicate + 'static) -> Self {
        Self {
            predicate: Box::new(predicate),
            picked: HashSet::new(),
            members: HashSet::new(),
        }
    }

    pub fn members(&self) -> &HashSet<EntityId> {
        &self.members
    }

    pub fn picked(&self) -> &HashSet<EntityId> {
        &self.picked
    }

    fn recompute(&mut self, id: &EntityId, snapshot: Option<&EntitySnapshot>) {
        let member = self.picked.contains(id) && snapshot.is_some_and(|s| self.predicate.admits(s));
        set_membership(&mut self.members, id, member);
    }

    fn pick(&mut self, id: &EntityId, picked: bool) {
        set_membership(&mut self.picked, id, picked);
    }

    fn forget(&mut self, id: &EntityId) {
        self.members.remove(id);
        self.picked.remove(id);
    }
}

impl std::fmt::Debug for SetActionSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SetActionSelection")
            .field("picked", &self.picked)
            .field("members", &self.members)
            .finish()
    }
}

/// Owns every derived set for one list view.
#[derive(Debug)]
pub struct SelectionEngine {
    sets: EligibilitySets,
    set_action: SetActionSelection,
}

impl SelectionEngine {
    pub fn new(predicate: impl SelectionPredicate + 'static) -> Self {
        Self {
            sets: EligibilitySets::default(),
            set_action: SetActionSelection::new(predicate),
        }
    }

    pub fn sets(&self) -> &EligibilitySets {
        &self.sets
    }

    pub fn set_action(&self) -> &SetActionSelection {
        &self.set_action
    }

    /// Re-derive every set for one entity from its current snapshot. A missing
    /// snapshot takes the entity out of every set.
    pub fn recompute(&mut self, id: &EntityId, snapshot: Option<&EntitySnapshot>) {
        match snapshot {
            Some(s) => self.sets.apply(id, derive_all(s)),
            None => self.sets.forget(id),
        }
        self.set_action.recompute(id, snapshot);
    }

    /// Mark or unmark a row for the set-access action, then re-derive.
    pub fn pick(&mut self, id: &EntityId, picked: bool, snapshot: Option<&EntitySnapshot>) {
        self.set_action.pick(id, picked);
        self.set_action.recompute(id, snapshot);
    }

    pub fn forget(&mut self, id: &EntityId) {
        self.sets.forget(id);
        self.set_action.forget(id);
    }

    /// Every id referenced by any derived set.
    pub fn referenced_ids(&self) -> impl Iterator<Item = &EntityId> {
        self.sets.ids().chain(self.set_action.members.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vmlist_core::PowerState;

    fn snap(id: &str, state: PowerState, actions: &[ActionKind]) -> EntitySnapshot {
        EntitySnapshot::new(id, id, state, actions.iter().copied())
    }

    #[test]
    fn recompute_moves_entity_between_sets() {
        let mut engine = SelectionEngine::new(RequiresAction(ActionKind::All));
        let id = EntityId::from("a");
        let actions = [ActionKind::Start, ActionKind::HardShutdown, ActionKind::Suspend, ActionKind::Pause];

        engine.recompute(&id, Some(&snap("a", PowerState::Halted, &actions)));
        assert!(engine.sets().get(EligibilityKind::Startable).contains(&id));
        assert!(!engine.sets().get(EligibilityKind::Stoppable).contains(&id));

        engine.recompute(&id, Some(&snap("a", PowerState::Running, &actions)));
        assert!(!engine.sets().get(EligibilityKind::Startable).contains(&id));
        assert!(engine.sets().get(EligibilityKind::Stoppable).contains(&id));
        assert!(engine.sets().get(EligibilityKind::Suspendable).contains(&id));
    }

    #[test]
    fn membership_matches_derivation() {
        let mut engine = SelectionEngine::new(RequiresAction(ActionKind::All));
        let s = snap("a", PowerState::Suspended, &[ActionKind::Resume, ActionKind::HardShutdown]);
        engine.recompute(&s.id, Some(&s));
        assert_eq!(engine.sets().membership(&s.id), derive_all(&s));
    }

    #[test]
    fn missing_snapshot_clears_everything() {
        let mut engine = SelectionEngine::new(RequiresAction(ActionKind::All));
        let s = snap("a", PowerState::Halted, &[ActionKind::Start, ActionKind::Destroy, ActionKind::All]);
        engine.recompute(&s.id, Some(&s));
        engine.pick(&s.id, true, Some(&s));
        assert!(engine.set_action().members().contains(&s.id));
        engine.recompute(&s.id, None);
        assert_eq!(engine.referenced_ids().count(), 0);
    }

    #[test]
    fn set_action_uses_injected_predicate() {
        let mut engine = SelectionEngine::new(|s: &EntitySnapshot| s.display_name.starts_with("prod"));
        let a = snap("prod-1", PowerState::Running, &[]);
        let b = snap("dev-1", PowerState::Running, &[]);
        engine.pick(&a.id, true, Some(&a));
        engine.pick(&b.id, true, Some(&b));
        assert!(engine.set_action().members().contains(&a.id));
        assert!(!engine.set_action().members().contains(&b.id));
    }

    #[test]
    fn set_action_holds_only_picked_rows() {
        let mut engine = SelectionEngine::new(RequiresAction(ActionKind::All));
        let a = snap("a", PowerState::Running, &[ActionKind::All]);
        let b = snap("b", PowerState::Running, &[ActionKind::All]);
        engine.recompute(&a.id, Some(&a));
        engine.recompute(&b.id, Some(&b));
        assert!(engine.set_action().members().is_empty());

        engine.pick(&a.id, true, Some(&a));
        assert_eq!(engine.set_action().members().len(), 1);
        assert!(engine.set_action().members().contains(&a.id));

        // Unpicking returns to the same state as never picking.
        engine.pick(&a.id, false, Some(&a));
        assert!(engine.set_action().members().is_empty());
        engine.pick(&b.id, true, Some(&b));
        assert!(engine.set_action().members().contains(&b.id));
    }

    #[test]
    fn picked_row_follows_permission_changes() {
        let mut engine = SelectionEngine::new(RequiresAction(ActionKind::All));
        let with = snap("a", PowerState::Running, &[ActionKind::All]);
        let without = snap("a", PowerState::Running, &[]);
        engine.pick(&with.id, true, Some(&without));
        assert!(engine.set_action().members().is_empty());

        engine.recompute(&with.id, Some(&with));
        assert!(engine.set_action().members().contains(&with.id));
        engine.recompute(&with.id, Some(&without));
        assert!(engine.set_action().members().is_empty());
        assert!(engine.set_action().picked().contains(&with.id));
    }

    #[test]
    fn forget_is_idempotent() {
        let mut engine = SelectionEngine::new(RequiresAction(ActionKind::All));
        let s = snap("a", PowerState::Halted, &[ActionKind::Start, ActionKind::All]);
        engine.recompute(&s.id, Some(&s));
        engine.pick(&s.id, true, Some(&s));
        engine.forget(&s.id);
        engine.forget(&s.id);
        assert_eq!(engine.referenced_ids().count(), 0);
        assert!(engine.set_action().picked().is_empty());
    }
}
