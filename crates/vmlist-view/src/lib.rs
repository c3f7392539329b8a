pub mod config;
pub mod dispatcher;
pub mod reducer;
pub mod scenario;
pub mod selection;
pub mod view;

pub use config::*;
pub use dispatcher::*;
pub use reducer::*;
pub use selection::*;
pub use view::*;

#[cfg(test)]
mod scenario_tests {
    use super::scenario::*;
    use super::Config;
    use std::path::Path;
    use vmlist_core::{BulkAction, EligibilityKind, EntityId};

    fn run(dir: &str) -> (ScenarioExpected, ScenarioResult) {
        let p = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../fixtures/scenarios").join(dir);
        let scenario = load_scenario(&p).unwrap();
        let res = super::scenario::run(&scenario, &Config::default()).unwrap();
        (scenario.expected, res)
    }

    fn assert_holds(dir: &str) -> ScenarioResult {
        let (expected, res) = run(dir);
        let mismatches = check(&expected, &res).unwrap();
        assert!(mismatches.is_empty(), "{dir}: {mismatches:#?}");
        res
    }

    fn ids(raw: &[&str]) -> Vec<EntityId> {
        raw.iter().map(|s| EntityId::from(*s)).collect()
    }

    #[test]
    fn scenario_sc01_pause_mixed_states() {
        let res = assert_holds("SC-01-pause-mixed");
        assert_eq!(res.reports.len(), 1);
        assert_eq!(res.reports[0].succeeded().count(), 2);
        assert!(res.reports[0].summary().contains("Failed: \"beta\""));
    }

    #[test]
    fn scenario_sc02_remove_is_absorbing() {
        let res = assert_holds("SC-02-remove-absorbing");
        assert!(!res.tracked.contains(&EntityId::from("OpaqueRef:gone")));
        assert_eq!(res.set_access, ids(&["OpaqueRef:a"]));
    }

    #[test]
    fn scenario_sc03_effects_reach_sets_via_feed() {
        let res = assert_holds("SC-03-effects-loop");
        assert_eq!(res.set(EligibilityKind::Startable), ids(&["OpaqueRef:a"]).as_slice());
    }

    #[test]
    fn scenario_sc04_identity_and_titles() {
        let res = assert_holds("SC-04-identity-titles");
        let title = res.title(BulkAction::Pause).unwrap();
        assert!(title.pause);
        assert!(title.unpause);
    }

    fn write_scenario(body: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("scenario.yaml"), body).unwrap();
        dir
    }

    #[test]
    fn unknown_step_is_a_parse_error() {
        let dir = write_scenario("name: bad\nsteps:\n  - explode: { id: \"OpaqueRef:a\" }\n");
        let err = load_scenario(dir.path()).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.starts_with("parse scenario.yaml"), "{msg}");
        assert!(msg.contains("explode"), "{msg}");
    }

    #[test]
    fn unknown_trigger_action_is_reported_with_step() {
        let dir = write_scenario("name: bad\nsteps:\n  - trigger: { action: reboot }\n");
        let err = simulate(dir.path(), &Config::default()).unwrap_err();
        assert_eq!(format!("{err:#}"), "step 0: unknown action reboot");
    }

    #[test]
    fn missing_scenario_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = simulate(dir.path(), &Config::default()).unwrap_err();
        assert!(format!("{err:#}").contains("read scenario.yaml"));
    }

    #[test]
    fn steps_parse_from_single_key_maps() {
        let dir = write_scenario(
            "name: forms\nsteps:\n  - remove: \"OpaqueRef:a\"\n  - notify: { kind: change, id: \"OpaqueRef:a\" }\n  - pick: { id: \"OpaqueRef:a\", picked: false }\n",
        );
        let scenario = load_scenario(dir.path()).unwrap();
        assert_eq!(scenario.steps.len(), 3);
        assert!(matches!(scenario.steps[0], Step::Remove(_)));
        assert!(matches!(
            scenario.steps[1],
            Step::Notify { kind: vmlist_core::FeedKind::Change, .. }
        ));
        assert!(matches!(scenario.steps[2], Step::Pick { picked: false, .. }));
    }

    #[test]
    fn simulate_reads_scenario_from_disk() {
        let p = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../fixtures/scenarios/SC-02-remove-absorbing");
        let res = simulate(&p, &Config::default()).unwrap();
        assert!(res.calls.is_empty());
    }
}
