use std::collections::HashMap;
use std::sync::mpsc::{self, Sender};
use std::sync::{Mutex, MutexGuard, PoisonError};

use indexmap::IndexMap;
use tracing::debug;
use vmlist_core::{ActionKind, EntityId, EntitySnapshot, PowerState, RemoteCall};

use crate::types::{FeedMessage, FeedSubscription, RemoteError, Transport};

/// In-memory control plane for tests and scenario replay.
///
/// Holds the remote view of every entity, fans feed messages out to all
/// subscribers, records every invoked call and can be told to reject calls
/// for specific entities or fail everything during a simulated outage. With
/// effects enabled, each successful call updates
/// the remote snapshot and publishes the resulting `Change` (or `Remove` for
/// destroy), the way a real hypervisor would.
#[derive(Default)]
pub struct ScriptedTransport {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    remote: IndexMap<EntityId, EntitySnapshot>,
    subscribers: Vec<Sender<FeedMessage>>,
    calls: Vec<(RemoteCall, EntityId)>,
    failures: HashMap<EntityId, String>,
    outage: Option<String>,
    simulate_effects: bool,
}

impl Inner {
    fn publish(&mut self, msg: FeedMessage) {
        self.subscribers.retain(|tx| tx.send(msg.clone()).is_ok());
    }

    fn reachable(&self) -> Result<(), RemoteError> {
        match &self.outage {
            Some(reason) => Err(RemoteError::Transport(reason.clone())),
            None => Ok(()),
        }
    }
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entities(entities: impl IntoIterator<Item = EntitySnapshot>) -> Self {
        let t = Self::new();
        for e in entities {
            t.seed(e);
        }
        t
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_simulate_effects(&self, on: bool) {
        self.lock().simulate_effects = on;
    }

    /// Make the remote side aware of an entity without publishing anything.
    pub fn seed(&self, snapshot: EntitySnapshot) {
        self.lock().remote.insert(snapshot.id.clone(), snapshot);
    }

    /// Create a brand new entity remotely and announce it.
    pub fn spawn(&self, name: &str, state: PowerState, actions: impl IntoIterator<Item = ActionKind>) -> EntityId {
        let snapshot = EntitySnapshot::new(EntityId::generate(), name, state, actions);
        let id = snapshot.id.clone();
        self.push_add(snapshot);
        id
    }

    pub fn push_add(&self, snapshot: EntitySnapshot) {
        let mut inner = self.lock();
        inner.remote.insert(snapshot.id.clone(), snapshot.clone());
        inner.publish(FeedMessage::add(snapshot));
    }

    pub fn push_change(&self, snapshot: EntitySnapshot) {
        let mut inner = self.lock();
        inner.remote.insert(snapshot.id.clone(), snapshot.clone());
        inner.publish(FeedMessage::change(snapshot));
    }

    pub fn push_remove(&self, id: &EntityId) {
        let mut inner = self.lock();
        inner.remote.shift_remove(id);
        inner.publish(FeedMessage::remove(id.clone()));
    }

    /// Publish a message verbatim, e.g. to simulate redelivery.
    pub fn publish(&self, msg: FeedMessage) {
        self.lock().publish(msg);
    }

    pub fn fail_on(&self, id: &EntityId, reason: impl Into<String>) {
        self.lock().failures.insert(id.clone(), reason.into());
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// Until `restore` is called, list loads, subscriptions and calls fail
    /// with a transport error. Calls made during the outage are not recorded.
    pub fn cut_off(&self, reason: impl Into<String>) {
        self.lock().outage = Some(reason.into());
    }

    pub fn restore(&self) {
        self.lock().outage = None;
    }

    /// Every call received so far, in order, including rejected ones.
    pub fn calls(&self) -> Vec<(RemoteCall, EntityId)> {
        self.lock().calls.clone()
    }

    pub fn remote_snapshot(&self, id: &EntityId) -> Option<EntitySnapshot> {
        self.lock().remote.get(id).cloned()
    }
}

fn next_power_state(call: RemoteCall, current: PowerState) -> PowerState {
    match call {
        RemoteCall::Start { paused: true } => PowerState::Paused,
        RemoteCall::Start { paused: false } => PowerState::Running,
        RemoteCall::HardShutdown => PowerState::Halted,
        RemoteCall::Pause => match current {
            PowerState::Paused => PowerState::Running,
            _ => PowerState::Paused,
        },
        RemoteCall::Suspend => PowerState::Suspended,
        RemoteCall::Destroy => current,
    }
}

impl Transport for ScriptedTransport {
    fn fetch_list(&self) -> Result<Vec<EntitySnapshot>, RemoteError> {
        let inner = self.lock();
        inner.reachable()?;
        Ok(inner.remote.values().cloned().collect())
    }

    fn subscribe_list(&self) -> Result<FeedSubscription, RemoteError> {
        let mut inner = self.lock();
        inner.reachable()?;
        let (tx, rx) = mpsc::channel();
        inner.subscribers.push(tx);
        Ok(FeedSubscription::new(rx))
    }

    fn read_snapshot(&self, id: &EntityId) -> Option<EntitySnapshot> {
        self.remote_snapshot(id)
    }

    fn invoke_action(&self, call: RemoteCall, id: &EntityId) -> Result<(), RemoteError> {
        let mut inner = self.lock();
        inner.reachable()?;
        inner.calls.push((call, id.clone()));
        debug!(%call, %id, "scripted transport received call");

        if let Some(reason) = inner.failures.get(id) {
            return Err(RemoteError::Rejected {
                id: id.clone(),
                call,
                reason: reason.clone(),
            });
        }
        let Some(current) = inner.remote.get(id).cloned() else {
            return Err(RemoteError::NotFound(id.clone()));
        };

        if inner.simulate_effects {
            if call == RemoteCall::Destroy {
                inner.remote.shift_remove(id);
                inner.publish(FeedMessage::remove(id.clone()));
            } else {
                let next = EntitySnapshot {
                    power_state: next_power_state(call, current.power_state),
                    ..current
                };
                inner.remote.insert(id.clone(), next.clone());
                inner.publish(FeedMessage::change(next));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vmlist_core::FeedKind;

    fn snap(id: &str, state: PowerState) -> EntitySnapshot {
        EntitySnapshot::new(id, id, state, [ActionKind::Start, ActionKind::Pause])
    }

    #[test]
    fn fetch_list_keeps_insertion_order() {
        let t = ScriptedTransport::with_entities([snap("b", PowerState::Halted), snap("a", PowerState::Running)]);
        let ids: Vec<_> = t.fetch_list().unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![EntityId::from("b"), EntityId::from("a")]);
    }

    #[test]
    fn every_subscriber_sees_every_message() {
        let t = ScriptedTransport::new();
        let s1 = t.subscribe_list().unwrap();
        let s2 = t.subscribe_list().unwrap();
        t.push_add(snap("a", PowerState::Halted));
        t.push_remove(&EntityId::from("a"));
        assert_eq!(s1.drain().len(), 2);
        let msgs = s2.drain();
        assert_eq!(msgs[0].kind, FeedKind::Add);
        assert_eq!(msgs[1].kind, FeedKind::Remove);
        assert!(t.read_snapshot(&EntityId::from("a")).is_none());
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let t = ScriptedTransport::new();
        drop(t.subscribe_list().unwrap());
        t.push_add(snap("a", PowerState::Halted));
        assert!(t.lock().subscribers.is_empty());
    }

    #[test]
    fn rejected_calls_are_still_recorded() {
        let t = ScriptedTransport::with_entities([snap("a", PowerState::Halted)]);
        let id = EntityId::from("a");
        t.fail_on(&id, "permission revoked");
        let err = t.invoke_action(RemoteCall::Start { paused: false }, &id).unwrap_err();
        assert_eq!(err.reason(), "permission revoked");
        assert_eq!(t.calls().len(), 1);
    }

    #[test]
    fn outage_fails_everything_until_restored() {
        let t = ScriptedTransport::with_entities([snap("a", PowerState::Halted)]);
        let id = EntityId::from("a");
        t.cut_off("link down");

        assert_eq!(t.fetch_list().unwrap_err(), RemoteError::Transport("link down".into()));
        assert!(t.subscribe_list().is_err());
        let err = t.invoke_action(RemoteCall::Start { paused: false }, &id).unwrap_err();
        assert_eq!(err.reason(), "link down");
        assert!(t.calls().is_empty());

        t.restore();
        assert_eq!(t.fetch_list().unwrap().len(), 1);
        t.invoke_action(RemoteCall::Start { paused: false }, &id).unwrap();
        assert_eq!(t.calls().len(), 1);
    }

    #[test]
    fn unknown_entity_is_not_found() {
        let t = ScriptedTransport::new();
        let err = t.invoke_action(RemoteCall::Pause, &EntityId::from("ghost")).unwrap_err();
        assert_eq!(err, RemoteError::NotFound(EntityId::from("ghost")));
    }

    #[test]
    fn effects_publish_changes() {
        let t = ScriptedTransport::with_entities([snap("a", PowerState::Halted)]);
        t.set_simulate_effects(true);
        let sub = t.subscribe_list().unwrap();
        let id = EntityId::from("a");

        t.invoke_action(RemoteCall::Start { paused: true }, &id).unwrap();
        t.invoke_action(RemoteCall::Pause, &id).unwrap();
        t.invoke_action(RemoteCall::Destroy, &id).unwrap();

        let msgs = sub.drain();
        assert_eq!(msgs.len(), 3);
        assert_eq!(msgs[0].snapshot.as_ref().unwrap().power_state, PowerState::Paused);
        assert_eq!(msgs[1].snapshot.as_ref().unwrap().power_state, PowerState::Running);
        assert_eq!(msgs[2], FeedMessage::remove(id.clone()));
        assert!(t.remote_snapshot(&id).is_none());
    }

    #[test]
    fn spawn_announces_new_entity() {
        let t = ScriptedTransport::new();
        let sub = t.subscribe_list().unwrap();
        let id = t.spawn("fresh", PowerState::Halted, [ActionKind::Start]);
        let msg = sub.try_next().unwrap();
        assert_eq!(msg.kind, FeedKind::Add);
        assert_eq!(msg.id, id);
    }
}
