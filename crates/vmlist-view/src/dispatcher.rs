use tracing::{debug, info, warn};
use vmlist_core::{plan_call, ActionOutcome, BulkAction, DispatchReport, EntityId, OutcomeStatus, SkipReason};
use vmlist_store::EntityStore;
use vmlist_transport::Transport;

/// Issue one remote call per ref, sequentially and in the given order.
///
/// Each ref is looked up again at dispatch time so the call matches the
/// entity's current state. A failed call never stops the batch. Local state
/// is not touched; effects come back through the feed.
pub fn dispatch<S, T>(transport: &T, store: &S, action: BulkAction, refs: &[EntityId]) -> DispatchReport
where
    S: EntityStore + ?Sized,
    T: Transport + ?Sized,
{
    info!(%action, count = refs.len(), "dispatching bulk action");
    let mut report = DispatchReport::new(action);

    for id in refs {
        let Some(snapshot) = store.get(id) else {
            debug!(%id, %action, "entity gone before dispatch");
            report.outcomes.push(ActionOutcome {
                id: id.clone(),
                display_name: None,
                call: None,
                status: OutcomeStatus::Skipped(SkipReason::NotFound),
            });
            continue;
        };

        let outcome = match plan_call(action, &snapshot) {
            Err(reason) => {
                debug!(%id, %reason, "skipping stale selection");
                ActionOutcome {
                    id: id.clone(),
                    display_name: Some(snapshot.display_name.clone()),
                    call: None,
                    status: OutcomeStatus::Skipped(reason),
                }
            }
            Ok(call) => {
                let status = match transport.invoke_action(call, id) {
                    Ok(()) => OutcomeStatus::Invoked,
                    Err(e) => {
                        warn!(%id, %call, error = %e, "remote call failed");
                        OutcomeStatus::Failed(e.reason())
                    }
                };
                ActionOutcome {
                    id: id.clone(),
                    display_name: Some(snapshot.display_name.clone()),
                    call: Some(call),
                    status,
                }
            }
        };
        report.outcomes.push(outcome);
    }

    info!(
        %action,
        succeeded = report.succeeded().count(),
        failed = report.failed().count(),
        skipped = report.skipped().count(),
        "bulk action finished"
    );
    report
}
