use wrapped_logging::{short_wallet, wrapped_debug, wrapped_info, wrapped_trace};

use crate::state::{Acceptance, Rejection};
use crate::{AppState, Effect, JobId, JobSnapshot, Msg, NoticeKind, StartFailure};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let mut effects = Vec::new();
    match msg {
        Msg::WalletConnected(wallet) => {
            if state.wallet() == Some(wallet.as_str()) {
                return (state, effects);
            }
            wrapped_info!("Wallet connected: {}", short_wallet(&wallet));
            teardown(&mut state, &mut effects);
            state.reset_session(Some(wallet.clone()));
            effects.push(Effect::Subscribe {
                wallet: wallet.clone(),
            });
            effects.push(Effect::Rediscover { wallet });
        }
        Msg::WalletDisconnected => {
            if state.wallet().is_none() {
                return (state, effects);
            }
            wrapped_info!("Wallet disconnected");
            teardown(&mut state, &mut effects);
            state.reset_session(None);
        }
        Msg::StartClicked => {
            let Some(wallet) = state.wallet().map(ToOwned::to_owned) else {
                state.set_notice(NoticeKind::WalletNotConnected);
                return (state, effects);
            };
            if state.creating().is_some() {
                wrapped_debug!("Start ignored: a create request is already outstanding");
                return (state, effects);
            }
            state.clear_notice();
            let request = state.begin_create();
            effects.push(Effect::CreateJob { wallet, request });
        }
        Msg::RetryClicked => {
            state.clear_notice();
            if !state.clear_failed() && state.creating().is_none() {
                if let Some(wallet) = state.wallet().map(ToOwned::to_owned) {
                    effects.push(Effect::Rediscover { wallet });
                }
            }
        }
        Msg::DismissNotice => {
            state.clear_notice();
        }
        Msg::Rediscovered { wallet, snapshot } => {
            if state.wallet() != Some(wallet.as_str()) {
                wrapped_trace!("Discarded rediscovery result for a previous wallet");
            } else if let Some(snapshot) = snapshot {
                let id = snapshot.id.clone();
                let outcome = state.apply_rediscovery(snapshot);
                log_outcome("rediscovery", &id, outcome);
            } else {
                wrapped_debug!("No existing job for {}", short_wallet(&wallet));
            }
        }
        Msg::SnapshotReceived { source, snapshot } => {
            let id = snapshot.id.clone();
            let outcome = state.apply_snapshot(snapshot);
            log_outcome(&format!("{source:?}"), &id, outcome);
        }
        Msg::JobCreated { request, snapshot } => {
            on_job_created(&mut state, request, &snapshot);
        }
        Msg::CreateFailed { request, failure } => {
            if state.abort_create(request) {
                let kind = match failure {
                    StartFailure::Conflict => NoticeKind::Conflict,
                    StartFailure::Unavailable => NoticeKind::StartFailed,
                };
                state.set_notice(kind);
            } else {
                wrapped_trace!("Ignoring failure of superseded create request {request}");
            }
        }
    }

    sync_polling(&mut state, &mut effects);
    (state, effects)
}

fn on_job_created(state: &mut AppState, request: u64, snapshot: &JobSnapshot) {
    if state.finish_create(request, snapshot) {
        wrapped_info!("Tracking new job {}", snapshot.id);
    } else {
        wrapped_debug!(
            "Ignoring created job {} for superseded request {request}",
            snapshot.id
        );
    }
}

/// Releases the producers tied to the current wallet session.
fn teardown(state: &mut AppState, effects: &mut Vec<Effect>) {
    if state.poll_target().is_some() {
        effects.push(Effect::StopPolling);
        state.set_poll_target(None);
    }
    if state.wallet().is_some() {
        effects.push(Effect::Unsubscribe);
    }
}

/// Emits polling effects when the desired poll target changed.
fn sync_polling(state: &mut AppState, effects: &mut Vec<Effect>) {
    let desired = state.desired_poll_target();
    if desired.as_ref() == state.poll_target() {
        return;
    }
    match desired.clone() {
        Some(target) => effects.push(Effect::StartPolling(target)),
        None => effects.push(Effect::StopPolling),
    }
    state.set_poll_target(desired);
}

fn log_outcome(source: &str, id: &JobId, outcome: Acceptance) {
    match outcome {
        Acceptance::Adopted => wrapped_info!("Adopted job {id} from {source}"),
        Acceptance::Rebound => wrapped_info!("Switched to newer job {id} from {source}"),
        Acceptance::Advanced => wrapped_debug!("Job {id} advanced via {source}"),
        Acceptance::Unchanged => wrapped_trace!("Duplicate snapshot for job {id} via {source}"),
        Acceptance::Rejected(Rejection::Stale) => {
            wrapped_trace!("Discarded stale snapshot for job {id} via {source}")
        }
        Acceptance::Rejected(reason) => {
            wrapped_trace!("Discarded snapshot for job {id} via {source}: {reason:?}")
        }
    }
}
