//! Fixture-driven replay: seed a scripted remote from raw payloads, feed it a
//! sequence of list events and bulk triggers, then compare the end state with
//! what the fixture expects.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};
use vmlist_core::{
    ActionTitle, BulkAction, DispatchReport, EligibilityKind, EntityId, EntitySnapshot, FeedKind, IdentityPolicy,
    Normalized,
};
use vmlist_transport::ScriptedTransport;

use crate::config::Config;
use crate::view::ListView;

#[derive(Debug, Deserialize)]
pub struct Scenario {
    pub name: String,
    /// Simulate the remote effect of every successful call.
    #[serde(default)]
    pub effects: bool,
    #[serde(default)]
    pub initial: Vec<Value>,
    /// Each step is a single-key map, e.g. `- trigger: { action: pause }`.
    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub expected: ScenarioExpected,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Create the entity remotely and publish `Add`.
    Add(Value),
    /// Update the entity remotely and publish `Change`.
    Change(Value),
    /// Delete the entity remotely and publish `Remove`.
    Remove(EntityId),
    /// Deliver a bare event without touching the remote side.
    Notify { kind: FeedKind, id: EntityId },
    Pick {
        id: EntityId,
        #[serde(default = "default_picked")]
        picked: bool,
    },
    Trigger {
        action: String,
        #[serde(default)]
        fail: Vec<EntityId>,
    },
}

fn default_picked() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
pub struct ScenarioExpected {
    #[serde(default)]
    pub tracked: Option<Vec<EntityId>>,
    #[serde(default)]
    pub sets: ExpectedSets,
    #[serde(default)]
    pub set_access: Option<Vec<EntityId>>,
    /// `"<call> <id>"`, in issue order.
    #[serde(default)]
    pub calls: Option<Vec<String>>,
    /// Bulk action name to title summary.
    #[serde(default)]
    pub titles: BTreeMap<String, String>,
    #[serde(default)]
    pub failed: Option<Vec<EntityId>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExpectedSets {
    #[serde(default)]
    pub startable: Option<Vec<EntityId>>,
    #[serde(default)]
    pub stoppable: Option<Vec<EntityId>>,
    #[serde(default)]
    pub pause_toggleable: Option<Vec<EntityId>>,
    #[serde(default)]
    pub suspendable: Option<Vec<EntityId>>,
    #[serde(default)]
    pub destroyable: Option<Vec<EntityId>>,
}

impl ExpectedSets {
    fn get(&self, kind: EligibilityKind) -> Option<&Vec<EntityId>> {
        match kind {
            EligibilityKind::Startable => self.startable.as_ref(),
            EligibilityKind::Stoppable => self.stoppable.as_ref(),
            EligibilityKind::PauseToggleable => self.pause_toggleable.as_ref(),
            EligibilityKind::Suspendable => self.suspendable.as_ref(),
            EligibilityKind::Destroyable => self.destroyable.as_ref(),
        }
    }
}

#[derive(Debug)]
pub struct ScenarioResult {
    pub tracked: Vec<EntityId>,
    /// Each eligibility set in list order.
    pub sets: Vec<(EligibilityKind, Vec<EntityId>)>,
    pub set_access: Vec<EntityId>,
    pub calls: Vec<String>,
    pub titles: Vec<(BulkAction, ActionTitle)>,
    pub reports: Vec<DispatchReport>,
}

impl ScenarioResult {
    pub fn set(&self, kind: EligibilityKind) -> &[EntityId] {
        self.sets
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, ids)| ids.as_slice())
            .unwrap_or(&[])
    }

    pub fn title(&self, action: BulkAction) -> Option<&ActionTitle> {
        self.titles.iter().find(|(a, _)| *a == action).map(|(_, t)| t)
    }

    /// Ids whose remote call failed, across every trigger.
    pub fn failed(&self) -> Vec<EntityId> {
        self.reports.iter().flat_map(|r| r.failed().map(|o| o.id.clone())).collect()
    }
}

pub fn load_scenario(dir: &Path) -> Result<Scenario> {
    let p = dir.join("scenario.yaml");
    let s = std::fs::read_to_string(&p).with_context(|| format!("read scenario.yaml: {}", p.display()))?;
    let scenario: Scenario = serde_yaml::from_str(&s).with_context(|| "parse scenario.yaml")?;
    Ok(scenario)
}

/// Replay the scenario in `dir` and return the end state.
pub fn simulate(dir: &Path, config: &Config) -> Result<ScenarioResult> {
    let scenario = load_scenario(dir)?;
    run(&scenario, config)
}

pub fn run(scenario: &Scenario, config: &Config) -> Result<ScenarioResult> {
    info!(name = %scenario.name, steps = scenario.steps.len(), "replaying scenario");
    let transport = ScriptedTransport::new();
    transport.set_simulate_effects(scenario.effects);
    for payload in &scenario.initial {
        if let Some(snapshot) = decode(&config.identity, payload)? {
            transport.seed(snapshot);
        }
    }

    let mut view = ListView::open(transport, config)?;
    let mut reports = Vec::new();

    for (i, step) in scenario.steps.iter().enumerate() {
        match step {
            Step::Add(payload) => {
                if let Some(snapshot) = decode(&config.identity, payload)? {
                    view.transport().push_add(snapshot);
                }
            }
            Step::Change(payload) => {
                if let Some(snapshot) = decode(&config.identity, payload)? {
                    view.transport().push_change(snapshot);
                }
            }
            Step::Remove(id) => view.transport().push_remove(id),
            Step::Notify { kind, id } => {
                view.pump();
                view.notify(*kind, id);
            }
            Step::Pick { id, picked } => {
                view.pump();
                view.pick(id, *picked);
            }
            Step::Trigger { action, fail } => {
                let action = BulkAction::parse(action).ok_or_else(|| anyhow!("step {i}: unknown action {action}"))?;
                view.pump();
                for id in fail {
                    view.transport().fail_on(id, "rejected by scenario");
                }
                reports.push(view.trigger_action(action));
                view.transport().clear_failures();
            }
        }
        view.pump();
    }

    view.check_invariants().with_context(|| format!("scenario {}", scenario.name))?;

    Ok(ScenarioResult {
        tracked: view.tracked().to_vec(),
        sets: EligibilityKind::ALL.into_iter().map(|k| (k, view.eligible(k))).collect(),
        set_access: view.selected_for_set_action(),
        calls: view
            .transport()
            .calls()
            .into_iter()
            .map(|(call, id)| format!("{call} {id}"))
            .collect(),
        titles: BulkAction::ALL.into_iter().map(|a| (a, view.title(a))).collect(),
        reports,
    })
}

fn decode(policy: &IdentityPolicy, payload: &Value) -> Result<Option<EntitySnapshot>> {
    match policy.normalize(payload).with_context(|| "decode entity payload")? {
        Normalized::Entity(snapshot) => Ok(Some(snapshot)),
        Normalized::Unidentifiable => {
            warn!(%payload, "payload has no identity of its own; skipped");
            Ok(None)
        }
    }
}

/// Every way `result` departs from `expected`. Empty means the scenario holds.
pub fn check(expected: &ScenarioExpected, result: &ScenarioResult) -> Result<Vec<String>> {
    let mut mismatches = Vec::new();

    if let Some(tracked) = &expected.tracked {
        if *tracked != result.tracked {
            mismatches.push(format!("tracked: expected {tracked:?}, got {:?}", result.tracked));
        }
    }
    for kind in EligibilityKind::ALL {
        if let Some(want) = expected.sets.get(kind) {
            let got = result.set(kind);
            if as_set(want) != as_set(got) {
                mismatches.push(format!("{kind:?}: expected {want:?}, got {got:?}"));
            }
        }
    }
    if let Some(want) = &expected.set_access {
        if as_set(want) != as_set(&result.set_access) {
            mismatches.push(format!("set_access: expected {want:?}, got {:?}", result.set_access));
        }
    }
    if let Some(calls) = &expected.calls {
        if *calls != result.calls {
            mismatches.push(format!("calls: expected {calls:?}, got {:?}", result.calls));
        }
    }
    for (name, want) in &expected.titles {
        let action = BulkAction::parse(name).ok_or_else(|| anyhow!("unknown action in titles: {name}"))?;
        let got = result.title(action).map(|t| t.summary.as_str()).unwrap_or_default();
        if got != want {
            mismatches.push(format!("title {action}: expected {want:?}, got {got:?}"));
        }
    }
    if let Some(want) = &expected.failed {
        let got = result.failed();
        if as_set(want) != as_set(&got) {
            mismatches.push(format!("failed: expected {want:?}, got {got:?}"));
        }
    }
    Ok(mismatches)
}

fn as_set(ids: &[EntityId]) -> BTreeSet<&str> {
    ids.iter().map(EntityId::as_str).collect()
}
