use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{BulkAction, EntityId, PowerState, RemoteCall};

/// Why no call was issued for an entity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// Entity no longer in the store when its turn came.
    NotFound,
    /// Entity state changed after it was selected.
    StaleState { action: BulkAction, state: PowerState },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotFound => f.write_str("no longer present"),
            SkipReason::StaleState { action, state } => write!(f, "cannot {action} while {state:?}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeStatus {
    Invoked,
    Failed(String),
    Skipped(SkipReason),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub id: EntityId,
    /// Display name at dispatch time; `None` when the entity was not found.
    pub display_name: Option<String>,
    pub call: Option<RemoteCall>,
    pub status: OutcomeStatus,
}

impl ActionOutcome {
    fn label(&self) -> String {
        format!("\"{}\"", self.display_name.as_deref().unwrap_or(self.id.as_str()))
    }
}

/// Per-entity results of one bulk action, in dispatch order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub action: BulkAction,
    pub outcomes: Vec<ActionOutcome>,
}

impl DispatchReport {
    pub fn new(action: BulkAction) -> Self {
        Self {
            action,
            outcomes: Vec::new(),
        }
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &ActionOutcome> {
        self.outcomes.iter().filter(|o| o.status == OutcomeStatus::Invoked)
    }

    pub fn failed(&self) -> impl Iterator<Item = &ActionOutcome> {
        self.outcomes.iter().filter(|o| matches!(o.status, OutcomeStatus::Failed(_)))
    }

    pub fn skipped(&self) -> impl Iterator<Item = &ActionOutcome> {
        self.outcomes.iter().filter(|o| matches!(o.status, OutcomeStatus::Skipped(_)))
    }

    pub fn is_complete_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.status == OutcomeStatus::Invoked)
    }

    /// Human readable summary, one line per non-empty category.
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();

        let ok: Vec<String> = self.succeeded().map(ActionOutcome::label).collect();
        if !ok.is_empty() {
            lines.push(format!("Succeeded: {}", ok.join(", ")));
        }

        let failed: Vec<String> = self
            .outcomes
            .iter()
            .filter_map(|o| match &o.status {
                OutcomeStatus::Failed(reason) => Some(format!("{} ({reason})", o.label())),
                _ => None,
            })
            .collect();
        if !failed.is_empty() {
            lines.push(format!("Failed: {}", failed.join(", ")));
        }

        let skipped: Vec<String> = self
            .outcomes
            .iter()
            .filter_map(|o| match &o.status {
                OutcomeStatus::Skipped(reason) => Some(format!("{} ({reason})", o.label())),
                _ => None,
            })
            .collect();
        if !skipped.is_empty() {
            lines.push(format!("Skipped: {}", skipped.join(", ")));
        }

        if lines.is_empty() {
            return format!("Nothing to {}", self.action);
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(id: &str, name: Option<&str>, status: OutcomeStatus) -> ActionOutcome {
        ActionOutcome {
            id: EntityId::from(id),
            display_name: name.map(str::to_string),
            call: None,
            status,
        }
    }

    #[test]
    fn summary_groups_by_status() {
        let mut report = DispatchReport::new(BulkAction::Stop);
        report.outcomes.push(outcome("a", Some("vm1"), OutcomeStatus::Invoked));
        report.outcomes.push(outcome("b", Some("vm2"), OutcomeStatus::Failed("denied".into())));
        report.outcomes.push(outcome("c", None, OutcomeStatus::Skipped(SkipReason::NotFound)));
        report.outcomes.push(outcome("d", Some("vm4"), OutcomeStatus::Invoked));

        assert_eq!(
            report.summary(),
            "Succeeded: \"vm1\", \"vm4\"\nFailed: \"vm2\" (denied)\nSkipped: \"c\" (no longer present)"
        );
        assert!(!report.is_complete_success());
        assert_eq!(report.failed().count(), 1);
        assert_eq!(report.skipped().count(), 1);
    }

    #[test]
    fn empty_report() {
        let report = DispatchReport::new(BulkAction::Destroy);
        assert_eq!(report.summary(), "Nothing to destroy");
        assert!(report.is_complete_success());
    }
}
