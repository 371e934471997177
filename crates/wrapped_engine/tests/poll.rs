use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::runtime::Handle;
use wrapped_engine::{
    spawn_poll_loop, EngineEvent, EventSink, JobRecord, JobStore, MemoryJobStore, NewJob,
    PollTarget, RecordStatus, Source,
};

const INTERVAL: Duration = Duration::from_millis(20);

#[derive(Default)]
struct TestSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl TestSink {
    fn records(&self) -> Vec<JobRecord> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                EngineEvent::Snapshot {
                    source: Source::Poll,
                    record,
                } => Some(record.clone()),
                _ => None,
            })
            .collect()
    }

    fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}

impl EventSink for TestSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn new_job(wallet: &str) -> NewJob {
    NewJob {
        wallet_address: wallet.to_string(),
        status: RecordStatus::Pending,
        tx_signature: None,
        created_at: Utc::now(),
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..100 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn polls_tracked_id_until_terminal() {
    wrapped_logging::initialize_for_tests();
    let store = Arc::new(MemoryJobStore::new());
    let sink = Arc::new(TestSink::default());
    let job = store.create(new_job("W1")).await.unwrap();
    let target = PollTarget {
        wallet: "W1".into(),
        job_id: Some(job.id.clone()),
    };

    let handle = spawn_poll_loop(&Handle::current(), store.clone(), target, INTERVAL, sink.clone());
    wait_until(|| sink.len() >= 2).await;
    assert!(sink
        .records()
        .iter()
        .all(|record| record.status == RecordStatus::Pending));

    store.update_record(
        &job.id,
        RecordStatus::Completed,
        Some(serde_json::json!({ "persona": "whale" })),
        None,
    );
    wait_until(|| {
        sink.records()
            .last()
            .is_some_and(|record| record.status == RecordStatus::Completed)
    })
    .await;

    let settled = sink.len();
    tokio::time::sleep(INTERVAL * 4).await;
    assert_eq!(sink.len(), settled);
    assert!(!handle.is_stopped());
    drop(handle);
}

#[tokio::test]
async fn polls_latest_for_wallet_without_id() {
    let store = Arc::new(MemoryJobStore::new());
    let sink = Arc::new(TestSink::default());
    store.create(new_job("W1")).await.unwrap();
    let newest = store.create(new_job("W1")).await.unwrap();
    let target = PollTarget {
        wallet: "W1".into(),
        job_id: None,
    };

    let _handle = spawn_poll_loop(&Handle::current(), store.clone(), target, INTERVAL, sink.clone());
    wait_until(|| sink.len() >= 1).await;

    assert_eq!(sink.records()[0].id, newest.id);
}

#[tokio::test]
async fn read_failures_do_not_stop_polling() {
    wrapped_logging::initialize_for_tests();
    let store = Arc::new(MemoryJobStore::new());
    let sink = Arc::new(TestSink::default());
    let job = store.create(new_job("W1")).await.unwrap();
    store.set_offline(true);
    let target = PollTarget {
        wallet: "W1".into(),
        job_id: Some(job.id.clone()),
    };

    let _handle = spawn_poll_loop(&Handle::current(), store.clone(), target, INTERVAL, sink.clone());
    tokio::time::sleep(INTERVAL * 4).await;
    assert_eq!(sink.len(), 0);

    store.set_offline(false);
    wait_until(|| sink.len() >= 1).await;
    assert_eq!(sink.records()[0].id, job.id);
}

#[tokio::test]
async fn dropping_handle_stops_reads() {
    let store = Arc::new(MemoryJobStore::new());
    let sink = Arc::new(TestSink::default());
    let job = store.create(new_job("W1")).await.unwrap();
    let target = PollTarget {
        wallet: "W1".into(),
        job_id: Some(job.id),
    };

    let handle = spawn_poll_loop(&Handle::current(), store.clone(), target, INTERVAL, sink.clone());
    wait_until(|| sink.len() >= 1).await;
    drop(handle);

    tokio::time::sleep(INTERVAL * 2).await;
    let stopped_at = sink.len();
    tokio::time::sleep(INTERVAL * 4).await;
    assert_eq!(sink.len(), stopped_at);
}

#[tokio::test]
async fn completion_without_payload_keeps_polling() {
    wrapped_logging::initialize_for_tests();
    let store = Arc::new(MemoryJobStore::new());
    let sink = Arc::new(TestSink::default());
    let job = store.create(new_job("W1")).await.unwrap();
    let target = PollTarget {
        wallet: "W1".into(),
        job_id: Some(job.id.clone()),
    };

    let handle = spawn_poll_loop(&Handle::current(), store.clone(), target, INTERVAL, sink.clone());
    store.update_record(&job.id, RecordStatus::Completed, None, None);
    wait_until(|| {
        sink.records()
            .iter()
            .filter(|record| record.status == RecordStatus::Completed)
            .count()
            >= 2
    })
    .await;

    store.update_record(
        &job.id,
        RecordStatus::Completed,
        Some(serde_json::json!({ "persona": "whale" })),
        None,
    );
    wait_until(|| {
        sink.records()
            .last()
            .is_some_and(|record| record.result.is_some())
    })
    .await;

    let settled = sink.len();
    tokio::time::sleep(INTERVAL * 4).await;
    assert_eq!(sink.len(), settled);
    drop(handle);
}
