use vmlist_core::{ActionKind, EntitySnapshot, PowerState};
use vmlist_transport::{run_transport_contract_suite, ScriptedTransport, Transport};

#[test]
fn scripted_transport_passes_contract_when_empty() {
    let t = ScriptedTransport::new();
    run_transport_contract_suite(&t).unwrap();
}

#[test]
fn scripted_transport_passes_contract_with_entities() {
    let t = ScriptedTransport::with_entities([
        EntitySnapshot::new("OpaqueRef:1", "vm1", PowerState::Running, [ActionKind::Pause]),
        EntitySnapshot::new("OpaqueRef:2", "vm2", PowerState::Halted, [ActionKind::Start]),
    ]);
    t.spawn("vm3", PowerState::Suspended, [ActionKind::Resume]);
    t.set_simulate_effects(true);
    run_transport_contract_suite(&t).unwrap();
    // The suite's call against a missing id is recorded but changed nothing.
    assert_eq!(t.calls().len(), 1);
    assert_eq!(t.fetch_list().unwrap().len(), 3);
}
