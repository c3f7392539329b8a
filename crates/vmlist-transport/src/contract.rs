use std::collections::HashSet;

use anyhow::{anyhow, Result};
use vmlist_core::{EntityId, RemoteCall};

use crate::types::Transport;

/// Shared transport contract suite. Read-only apart from one call against an
/// id that must not exist, so it is safe to run against any transport.
pub fn run_transport_contract_suite(transport: &dyn Transport) -> Result<()> {
    let list = transport.fetch_list()?;

    let mut seen = HashSet::new();
    for snapshot in &list {
        if !seen.insert(snapshot.id.clone()) {
            return Err(anyhow!("fetch_list returned {} twice", snapshot.id));
        }
        let read = transport
            .read_snapshot(&snapshot.id)
            .ok_or_else(|| anyhow!("read_snapshot({}) missed a listed entity", snapshot.id))?;
        if read.id != snapshot.id {
            return Err(anyhow!("read_snapshot({}) returned {}", snapshot.id, read.id));
        }
    }

    let ghost = EntityId::from("contract:missing-entity");
    if transport.read_snapshot(&ghost).is_some() {
        return Err(anyhow!("read_snapshot found an entity that was never listed"));
    }
    if transport.invoke_action(RemoteCall::HardShutdown, &ghost).is_ok() {
        return Err(anyhow!("invoke_action on a missing entity must fail"));
    }

    let sub = transport.subscribe_list()?;
    // A fresh subscription must not replay history as Remove events.
    if sub.drain().iter().any(|m| seen.contains(&m.id) && m.snapshot.is_none()) {
        return Err(anyhow!("new subscription replayed removals for live entities"));
    }

    Ok(())
}
