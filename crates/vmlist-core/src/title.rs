use std::borrow::Borrow;

use serde::{Deserialize, Serialize};

use crate::{BulkAction, EntityId, EntitySnapshot, PowerState};

const PAUSE_FALLBACK: &str = "Pause or unpause";

/// Label and enabled state for one bulk-action button.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionTitle {
    pub enabled: bool,
    pub summary: String,
    /// Pause only: at least one entity would be paused (or started paused).
    pub pause: bool,
    /// Pause only: at least one entity would be unpaused.
    pub unpause: bool,
}

/// Build the button title for `action` over `refs`.
///
/// Refs the lookup cannot resolve are left out of the summary; `enabled`
/// only reflects whether `refs` is empty.
pub fn title_for<F, S>(action: BulkAction, refs: &[EntityId], lookup: F) -> ActionTitle
where
    F: Fn(&EntityId) -> Option<S>,
    S: Borrow<EntitySnapshot>,
{
    let held: Vec<S> = refs.iter().filter_map(|id| lookup(id)).collect();
    let snapshots = held.iter().map(|s| <S as Borrow<EntitySnapshot>>::borrow(s));
    let enabled = !refs.is_empty();

    if action == BulkAction::Pause {
        return pause_title(enabled, snapshots);
    }

    let names: Vec<String> = snapshots.map(quoted).collect();
    let summary = if names.is_empty() {
        action.verb().to_string()
    } else {
        format!("{} {}", action.verb(), names.join(", "))
    };
    ActionTitle {
        enabled,
        summary,
        pause: false,
        unpause: false,
    }
}

fn pause_title<'a>(enabled: bool, snapshots: impl Iterator<Item = &'a EntitySnapshot>) -> ActionTitle {
    let mut to_pause = Vec::new();
    let mut to_unpause = Vec::new();

    for s in snapshots {
        match s.power_state {
            PowerState::Paused => to_unpause.push(quoted(s)),
            PowerState::Running => to_pause.push(quoted(s)),
            PowerState::Suspended => to_pause.push(format!("{} (with resuming)", quoted(s))),
            PowerState::Halted => to_pause.push(format!("{} (with starting)", quoted(s))),
        }
    }

    let mut lines = Vec::new();
    if !to_pause.is_empty() {
        lines.push(format!("Pause {}", to_pause.join(", ")));
    }
    if !to_unpause.is_empty() {
        lines.push(format!("Unpause {}", to_unpause.join(", ")));
    }

    ActionTitle {
        enabled,
        summary: if lines.is_empty() {
            PAUSE_FALLBACK.to_string()
        } else {
            lines.join("\n")
        },
        pause: !to_pause.is_empty(),
        unpause: !to_unpause.is_empty(),
    }
}

fn quoted(s: &EntitySnapshot) -> String {
    format!("\"{}\"", s.display_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ActionKind;
    use std::collections::HashMap;

    fn table(entries: &[(&str, &str, PowerState)]) -> HashMap<EntityId, EntitySnapshot> {
        entries
            .iter()
            .map(|(id, name, state)| {
                (EntityId::from(*id), EntitySnapshot::new(*id, *name, *state, [ActionKind::Start]))
            })
            .collect()
    }

    #[test]
    fn pause_annotates_start_and_resume() {
        let t = table(&[("a", "vm1", PowerState::Suspended), ("b", "vm2", PowerState::Halted)]);
        let refs = vec![EntityId::from("a"), EntityId::from("b")];
        let title = title_for(BulkAction::Pause, &refs, |id| t.get(id));
        assert!(title.enabled);
        assert!(title.summary.contains("\"vm1\" (with resuming)"));
        assert!(title.summary.contains("\"vm2\" (with starting)"));
        assert_eq!(title.summary, "Pause \"vm1\" (with resuming), \"vm2\" (with starting)");
        assert!(title.pause);
        assert!(!title.unpause);
    }

    #[test]
    fn pause_splits_unpause_line() {
        let t = table(&[("a", "vm1", PowerState::Running), ("b", "vm2", PowerState::Paused)]);
        let refs = vec![EntityId::from("a"), EntityId::from("b")];
        let title = title_for(BulkAction::Pause, &refs, |id| t.get(id));
        assert_eq!(title.summary, "Pause \"vm1\"\nUnpause \"vm2\"");
        assert!(title.pause && title.unpause);
    }

    #[test]
    fn empty_refs_disable_button() {
        let t = table(&[]);
        let title = title_for(BulkAction::Pause, &[], |id| t.get(id));
        assert!(!title.enabled);
        assert_eq!(title.summary, "Pause or unpause");

        let title = title_for(BulkAction::Start, &[], |id| t.get(id));
        assert!(!title.enabled);
        assert_eq!(title.summary, "Start");
    }

    #[test]
    fn generic_title_joins_names() {
        let t = table(&[("a", "vm1", PowerState::Halted), ("b", "vm2", PowerState::Halted)]);
        let refs = vec![EntityId::from("a"), EntityId::from("missing"), EntityId::from("b")];
        let title = title_for(BulkAction::Destroy, &refs, |id| t.get(id));
        assert!(title.enabled);
        assert_eq!(title.summary, "Delete \"vm1\", \"vm2\"");
    }
}
