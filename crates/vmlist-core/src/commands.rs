use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ActionKind, BulkAction, EntitySnapshot, PowerState, SkipReason};

/// One concrete remote call issued for one entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum RemoteCall {
    Start { paused: bool },
    HardShutdown,
    Pause,
    Suspend,
    Destroy,
}

impl RemoteCall {
    /// Permission the remote side checks for this call.
    pub fn action_kind(&self) -> ActionKind {
        match self {
            RemoteCall::Start { .. } => ActionKind::Start,
            RemoteCall::HardShutdown => ActionKind::HardShutdown,
            RemoteCall::Pause => ActionKind::Pause,
            RemoteCall::Suspend => ActionKind::Suspend,
            RemoteCall::Destroy => ActionKind::Destroy,
        }
    }
}

impl fmt::Display for RemoteCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteCall::Start { paused: false } => f.write_str("start"),
            RemoteCall::Start { paused: true } => f.write_str("start-paused"),
            RemoteCall::HardShutdown => f.write_str("hard_shutdown"),
            RemoteCall::Pause => f.write_str("pause"),
            RemoteCall::Suspend => f.write_str("suspend"),
            RemoteCall::Destroy => f.write_str("destroy"),
        }
    }
}

/// Map a bulk action onto the call for one entity given its current state.
///
/// Pause on a halted or suspended entity becomes a paused start. Suspend is
/// re-checked here because the selection that fed it may be stale.
pub fn plan_call(action: BulkAction, snapshot: &EntitySnapshot) -> Result<RemoteCall, SkipReason> {
    let state = snapshot.power_state;
    match action {
        BulkAction::Start => Ok(RemoteCall::Start { paused: false }),
        BulkAction::Stop => Ok(RemoteCall::HardShutdown),
        BulkAction::Destroy => Ok(RemoteCall::Destroy),
        BulkAction::Pause => match state {
            PowerState::Running | PowerState::Paused => Ok(RemoteCall::Pause),
            PowerState::Halted | PowerState::Suspended => Ok(RemoteCall::Start { paused: true }),
        },
        BulkAction::Suspend => match state {
            PowerState::Running => Ok(RemoteCall::Suspend),
            other => Err(SkipReason::StaleState { action, state: other }),
        },
    }
}
