use serde::{Deserialize, Serialize};

use crate::{ActionKind, BulkAction, EntitySnapshot, PowerState};

/// The five derived eligibility categories.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityKind {
    Startable,
    Stoppable,
    PauseToggleable,
    Suspendable,
    Destroyable,
}

impl EligibilityKind {
    pub const ALL: [EligibilityKind; 5] = [
        EligibilityKind::Startable,
        EligibilityKind::Stoppable,
        EligibilityKind::PauseToggleable,
        EligibilityKind::Suspendable,
        EligibilityKind::Destroyable,
    ];
}

impl BulkAction {
    /// Eligibility set feeding this bulk action.
    pub fn eligibility(&self) -> EligibilityKind {
        match self {
            BulkAction::Start => EligibilityKind::Startable,
            BulkAction::Stop => EligibilityKind::Stoppable,
            BulkAction::Pause => EligibilityKind::PauseToggleable,
            BulkAction::Suspend => EligibilityKind::Suspendable,
            BulkAction::Destroy => EligibilityKind::Destroyable,
        }
    }
}

/// Membership of one snapshot in every eligibility category.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eligibility {
    pub startable: bool,
    pub stoppable: bool,
    pub destroyable: bool,
    pub pause_toggleable: bool,
    pub suspendable: bool,
}

impl Eligibility {
    pub fn get(&self, kind: EligibilityKind) -> bool {
        match kind {
            EligibilityKind::Startable => self.startable,
            EligibilityKind::Stoppable => self.stoppable,
            EligibilityKind::PauseToggleable => self.pause_toggleable,
            EligibilityKind::Suspendable => self.suspendable,
            EligibilityKind::Destroyable => self.destroyable,
        }
    }

    pub fn is_empty(&self) -> bool {
        EligibilityKind::ALL.iter().all(|k| !self.get(*k))
    }
}

/// The only place eligibility predicates are evaluated. Every derived set is
/// recomputed from this result, never patched on its own.
pub fn derive_all(snapshot: &EntitySnapshot) -> Eligibility {
    use PowerState::*;

    let state = snapshot.power_state;
    let permits = |a| snapshot.permits(a);

    Eligibility {
        startable: (state == Halted && permits(ActionKind::Start))
            || (state == Suspended && permits(ActionKind::Resume)),
        stoppable: state != Halted && permits(ActionKind::HardShutdown),
        destroyable: state == Halted && permits(ActionKind::Destroy),
        pause_toggleable: (state == Running && permits(ActionKind::Pause))
            || (state == Paused && permits(ActionKind::Unpause))
            || (state == Suspended && permits(ActionKind::Resume))
            || (state == Halted && permits(ActionKind::Start)),
        suspendable: state == Running && permits(ActionKind::Suspend),
    }
}
