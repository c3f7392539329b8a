use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::time::Duration;

use thiserror::Error;
use vmlist_core::{EntityId, EntitySnapshot, FeedKind, RemoteCall};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("{call} rejected for {id}: {reason}")]
    Rejected { id: EntityId, call: RemoteCall, reason: String },
    #[error("{0} not found on the remote side")]
    NotFound(EntityId),
    #[error("transport error: {0}")]
    Transport(String),
}

impl RemoteError {
    /// Short reason suitable for a per-entity summary line.
    pub fn reason(&self) -> String {
        match self {
            RemoteError::Rejected { reason, .. } => reason.clone(),
            RemoteError::NotFound(_) => "not found".to_string(),
            RemoteError::Transport(msg) => msg.clone(),
        }
    }
}

/// One push notification about the tracked list.
///
/// `snapshot` carries the full current state for `Add`/`Change` when the
/// transport has it; the shell writes it into the store before the reducer
/// sees the event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedMessage {
    pub kind: FeedKind,
    pub id: EntityId,
    pub snapshot: Option<EntitySnapshot>,
}

impl FeedMessage {
    pub fn add(snapshot: EntitySnapshot) -> Self {
        Self {
            kind: FeedKind::Add,
            id: snapshot.id.clone(),
            snapshot: Some(snapshot),
        }
    }

    pub fn change(snapshot: EntitySnapshot) -> Self {
        Self {
            kind: FeedKind::Change,
            id: snapshot.id.clone(),
            snapshot: Some(snapshot),
        }
    }

    pub fn remove(id: EntityId) -> Self {
        Self {
            kind: FeedKind::Remove,
            id,
            snapshot: None,
        }
    }
}

/// Receiving end of a list subscription. Delivery is at-least-once and in
/// order; duplicates are possible.
pub struct FeedSubscription {
    rx: Receiver<FeedMessage>,
}

impl FeedSubscription {
    pub fn new(rx: Receiver<FeedMessage>) -> Self {
        Self { rx }
    }

    /// Next message if one is already queued.
    pub fn try_next(&self) -> Option<FeedMessage> {
        match self.rx.try_recv() {
            Ok(msg) => Some(msg),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Block up to `timeout` for the next message.
    pub fn next_timeout(&self, timeout: Duration) -> Option<FeedMessage> {
        match self.rx.recv_timeout(timeout) {
            Ok(msg) => Some(msg),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Everything queued right now, in delivery order.
    pub fn drain(&self) -> Vec<FeedMessage> {
        self.rx.try_iter().collect()
    }
}

/// Remote control plane as seen by the list view.
pub trait Transport: Send + Sync {
    /// Initial list load, in presentation order.
    fn fetch_list(&self) -> Result<Vec<EntitySnapshot>, RemoteError>;

    fn subscribe_list(&self) -> Result<FeedSubscription, RemoteError>;

    /// Current snapshot for one entity; `None` if it no longer exists.
    fn read_snapshot(&self, id: &EntityId) -> Option<EntitySnapshot>;

    fn invoke_action(&self, call: RemoteCall, id: &EntityId) -> Result<(), RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use vmlist_core::PowerState;

    #[test]
    fn next_timeout_waits_for_late_message() {
        let (tx, rx) = mpsc::channel();
        let sub = FeedSubscription::new(rx);
        let sender = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            tx.send(FeedMessage::remove(EntityId::from("a"))).unwrap();
        });
        let msg = sub.next_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(msg, FeedMessage::remove(EntityId::from("a")));
        sender.join().unwrap();
    }

    #[test]
    fn next_timeout_gives_up_when_idle() {
        let (tx, rx) = mpsc::channel::<FeedMessage>();
        let sub = FeedSubscription::new(rx);
        assert!(sub.next_timeout(Duration::from_millis(10)).is_none());
        drop(tx);
        assert!(sub.next_timeout(Duration::from_millis(10)).is_none());
    }

    #[test]
    fn transport_error_reason_is_the_message() {
        let err = RemoteError::Transport("connection reset".into());
        assert_eq!(err.reason(), "connection reset");
        let add = FeedMessage::add(EntitySnapshot::new("a", "a", PowerState::Halted, []));
        assert_eq!(add.kind, FeedKind::Add);
    }
}
