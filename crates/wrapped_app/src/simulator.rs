//! Demo job processor for the in-memory store.
//!
//! Stands in for the backend worker: new pending records move to
//! `processing` and then to a terminal status after configurable delays.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use wrapped_engine::{MemoryJobStore, RecordStatus};
use wrapped_logging::{short_wallet, wrapped_debug, wrapped_info};

const STEP: Duration = Duration::from_millis(100);
const PERSONAS: [&str; 4] = ["whale", "degen", "hodler", "explorer"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorSettings {
    /// Delay from creation until the job is picked up.
    pub processing_after_ms: u64,
    /// Delay from pickup until the job finishes.
    pub complete_after_ms: u64,
    /// Finish every job as failed instead of completed.
    pub fail: bool,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            processing_after_ms: 1_500,
            complete_after_ms: 3_000,
            fail: false,
        }
    }
}

pub struct Simulator {
    store: Arc<MemoryJobStore>,
    settings: SimulatorSettings,
    first_seen: HashMap<String, Instant>,
}

impl Simulator {
    pub fn new(store: Arc<MemoryJobStore>, settings: SimulatorSettings) -> Self {
        Self {
            store,
            settings,
            first_seen: HashMap::new(),
        }
    }

    /// Advances every live record whose delay has elapsed at `now`.
    /// Returns how many records changed status.
    pub fn step(&mut self, now: Instant) -> usize {
        let records = self.store.records();
        self.first_seen
            .retain(|id, _| records.iter().any(|record| &record.id == id));

        let pickup = Duration::from_millis(self.settings.processing_after_ms);
        let finish = pickup + Duration::from_millis(self.settings.complete_after_ms);
        let mut advanced = 0;
        for record in records {
            if record.status.is_terminal() {
                continue;
            }
            let seen = *self.first_seen.entry(record.id.clone()).or_insert(now);
            let elapsed = now.saturating_duration_since(seen);

            if elapsed >= finish {
                if self.settings.fail {
                    self.store.update_record(
                        &record.id,
                        RecordStatus::Failed,
                        None,
                        Some("Simulated processing failure".to_string()),
                    );
                } else {
                    let report = report_for(&record.wallet_address);
                    self.store
                        .update_record(&record.id, RecordStatus::Completed, Some(report), None);
                }
                wrapped_info!("Simulator finished job {}", record.id);
                advanced += 1;
            } else if elapsed >= pickup && record.status == RecordStatus::Pending {
                self.store
                    .update_record(&record.id, RecordStatus::Processing, None, None);
                wrapped_debug!("Simulator picked up job {}", record.id);
                advanced += 1;
            }
        }
        advanced
    }

    /// Runs on a background thread until the returned handle is dropped.
    pub fn spawn(mut self) -> SimulatorHandle {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();
        thread::spawn(move || {
            while !flag.load(Ordering::SeqCst) {
                self.step(Instant::now());
                thread::sleep(STEP);
            }
        });
        SimulatorHandle { stop }
    }
}

pub struct SimulatorHandle {
    stop: Arc<AtomicBool>,
}

impl Drop for SimulatorHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

/// Deterministic stand-in report for `wallet`.
pub fn report_for(wallet: &str) -> Value {
    let seed: u64 = wallet.bytes().map(u64::from).sum();
    json!({
        "wallet": short_wallet(wallet),
        "persona": PERSONAS[(seed % PERSONAS.len() as u64) as usize],
        "transactions": seed % 997 + 1,
    })
}
