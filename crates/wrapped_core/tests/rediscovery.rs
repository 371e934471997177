use chrono::{Duration, TimeZone, Utc};
use serde_json::json;
use wrapped_core::{
    update, AppState, Effect, JobId, JobPhase, JobSnapshot, JobStatus, Msg, PollTarget,
    SnapshotSource,
};

fn init_logging() {
    wrapped_logging::initialize_for_tests();
}

fn record(id: &str, phase: JobPhase, minutes: i64) -> JobSnapshot {
    JobSnapshot {
        id: JobId::from(id),
        wallet: "W1".to_string(),
        phase,
        created_at: Utc.timestamp_opt(1_735_000_000, 0).unwrap() + Duration::minutes(minutes),
    }
}

fn connected() -> AppState {
    update(AppState::new(), Msg::WalletConnected("W1".to_string())).0
}

fn rediscovered(state: AppState, snapshot: Option<JobSnapshot>) -> (AppState, Vec<Effect>) {
    update(
        state,
        Msg::Rediscovered {
            wallet: "W1".to_string(),
            snapshot,
        },
    )
}

fn poll_target(id: &str) -> Effect {
    Effect::StartPolling(PollTarget {
        wallet: "W1".to_string(),
        job_id: Some(JobId::from(id)),
    })
}

#[test]
fn in_flight_job_is_rediscovered_and_polled() {
    init_logging();
    let (state, effects) = rediscovered(connected(), Some(record("3", JobPhase::Pending, 0)));

    assert_eq!(effects, vec![poll_target("3")]);
    let view = state.view();
    assert_eq!(view.status, JobStatus::Pending);
    assert_eq!(view.job_id, Some(JobId::from("3")));
}

#[test]
fn finished_job_is_restored_without_polling() {
    init_logging();
    let finished = record("3", JobPhase::Completed(json!({ "persona": "whale" })), 0);
    let (state, effects) = rediscovered(connected(), Some(finished));

    assert!(effects.is_empty());
    let view = state.view();
    assert_eq!(view.status, JobStatus::Completed);
    assert_eq!(view.result, Some(json!({ "persona": "whale" })));
}

#[test]
fn empty_lookup_stays_idle() {
    init_logging();
    let (state, effects) = rediscovered(connected(), None);

    assert!(effects.is_empty());
    assert_eq!(state.view().status, JobStatus::Idle);
    assert_eq!(state.view().job_id, None);
}

#[test]
fn racing_lookups_prefer_newest_record() {
    init_logging();
    let older = record("1", JobPhase::Failed("stale run".to_string()), 0);
    let newer = record("2", JobPhase::Processing, 5);

    let (state, _) = rediscovered(connected(), Some(older.clone()));
    let (state, effects) = rediscovered(state, Some(newer.clone()));
    assert_eq!(effects, vec![poll_target("2")]);
    assert_eq!(state.view().job_id, Some(JobId::from("2")));
    assert_eq!(state.view().status, JobStatus::Processing);
    assert_eq!(state.view().error, None);

    let (state, _) = rediscovered(connected(), Some(newer));
    let (state, effects) = rediscovered(state, Some(older));
    assert!(effects.is_empty());
    assert_eq!(state.view().job_id, Some(JobId::from("2")));
    assert_eq!(state.view().status, JobStatus::Processing);
}

#[test]
fn rebinding_moves_the_poll_target() {
    init_logging();
    let (state, effects) = rediscovered(connected(), Some(record("1", JobPhase::Processing, 0)));
    assert_eq!(effects, vec![poll_target("1")]);

    let (_, effects) = rediscovered(state, Some(record("2", JobPhase::Pending, 1)));
    assert_eq!(effects, vec![poll_target("2")]);
}

#[test]
fn lookup_never_rebinds_a_created_job() {
    init_logging();
    let (state, _) = update(connected(), Msg::StartClicked);
    let (state, _) = update(
        state,
        Msg::JobCreated {
            request: 0,
            snapshot: record("5", JobPhase::Pending, 0),
        },
    );

    let (state, effects) = rediscovered(state, Some(record("9", JobPhase::Processing, 10)));

    assert!(effects.is_empty());
    assert_eq!(state.view().job_id, Some(JobId::from("5")));
    assert_eq!(state.view().status, JobStatus::Pending);
}

#[test]
fn lookup_for_previous_wallet_is_dropped() {
    init_logging();
    let (state, _) = update(connected(), Msg::WalletConnected("W2".to_string()));
    let (state, effects) = rediscovered(state, Some(record("1", JobPhase::Pending, 0)));

    assert!(effects.is_empty());
    assert_eq!(state.view().job_id, None);
}

#[test]
fn lookup_for_tracked_job_merges_like_a_snapshot() {
    init_logging();
    let (state, _) = rediscovered(connected(), Some(record("1", JobPhase::Processing, 0)));
    let (state, _) = update(
        state,
        Msg::SnapshotReceived {
            source: SnapshotSource::ChangeFeed,
            snapshot: record("1", JobPhase::Completed(json!({})), 0),
        },
    );

    let (state, effects) = rediscovered(state, Some(record("1", JobPhase::Processing, 0)));

    assert!(effects.is_empty());
    assert_eq!(state.view().status, JobStatus::Completed);
}

#[test]
fn poll_without_tracked_id_adopts_latest_record() {
    init_logging();
    let (state, effects) = update(
        connected(),
        Msg::SnapshotReceived {
            source: SnapshotSource::Poll,
            snapshot: record("8", JobPhase::Pending, 0),
        },
    );

    assert_eq!(effects, vec![poll_target("8")]);
    assert_eq!(state.view().job_id, Some(JobId::from("8")));
}
