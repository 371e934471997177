use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures_util::StreamExt;
use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::store::{JobStore, Subscription};
use crate::{CreateError, JobRecord, NewJob, RecordStatus, StoreError};

const UPDATE_CHANNEL_CAPACITY: usize = 64;

#[derive(Default)]
struct Inner {
    records: Vec<JobRecord>,
    next_id: u64,
}

/// In-process job table with a broadcast update stream.
///
/// Ids are assigned from a counter (`"1"`, `"2"`, ...). Inserts are not
/// announced on the update stream; only [`MemoryJobStore::update_record`]
/// is, matching a row-update change feed.
pub struct MemoryJobStore {
    inner: Mutex<Inner>,
    updates: broadcast::Sender<JobRecord>,
    unique_active: bool,
    offline: AtomicBool,
}

impl Default for MemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryJobStore {
    pub fn new() -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            inner: Mutex::new(Inner {
                records: Vec::new(),
                next_id: 1,
            }),
            updates,
            unique_active: false,
            offline: AtomicBool::new(false),
        }
    }

    /// Rejects creates while the wallet still has a pending or processing job.
    pub fn with_unique_active(mut self, unique_active: bool) -> Self {
        self.unique_active = unique_active;
        self
    }

    /// While offline every store call fails with [`StoreError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Inserts a fully formed record as-is, e.g. a row left by an earlier run.
    pub fn insert_record(&self, record: JobRecord) {
        self.lock().records.push(record);
    }

    /// Acts as the backend processor: rewrites a row and announces the update.
    pub fn update_record(
        &self,
        id: &str,
        status: RecordStatus,
        result: Option<Value>,
        error_message: Option<String>,
    ) -> Option<JobRecord> {
        let updated = {
            let mut inner = self.lock();
            let record = inner.records.iter_mut().find(|record| record.id == id)?;
            record.status = status;
            record.result = result;
            record.error_message = error_message;
            record.clone()
        };
        // No subscribers is fine.
        let _ = self.updates.send(updated.clone());
        Some(updated)
    }

    /// Copy of every stored record, in insertion order.
    pub fn records(&self) -> Vec<JobRecord> {
        self.lock().records.clone()
    }

    pub fn records_for(&self, wallet: &str) -> Vec<JobRecord> {
        self.lock()
            .records
            .iter()
            .filter(|record| record.wallet_address == wallet)
            .cloned()
            .collect()
    }

    /// Number of open change-feed subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.updates.receiver_count()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".into()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, job: NewJob) -> Result<JobRecord, CreateError> {
        self.ensure_online().map_err(CreateError::Store)?;
        let mut inner = self.lock();
        if self.unique_active
            && inner.records.iter().any(|record| {
                record.wallet_address == job.wallet_address && !record.status.is_terminal()
            })
        {
            return Err(CreateError::Conflict(format!(
                "an active job already exists for {}",
                job.wallet_address
            )));
        }
        let id = inner.next_id.to_string();
        inner.next_id += 1;
        let record = JobRecord {
            id,
            wallet_address: job.wallet_address,
            status: job.status,
            result: None,
            error_message: None,
            tx_signature: job.tx_signature,
            created_at: job.created_at,
        };
        inner.records.push(record.clone());
        Ok(record)
    }

    async fn delete_by_wallet(&self, wallet: &str) -> Result<usize, StoreError> {
        self.ensure_online()?;
        let mut inner = self.lock();
        let before = inner.records.len();
        inner.records.retain(|record| record.wallet_address != wallet);
        Ok(before - inner.records.len())
    }

    async fn read_latest(&self, wallet: &str) -> Result<Option<JobRecord>, StoreError> {
        self.ensure_online()?;
        Ok(self
            .lock()
            .records
            .iter()
            .filter(|record| record.wallet_address == wallet)
            .max_by_key(|record| record.created_at)
            .cloned())
    }

    async fn read_by_id(&self, id: &str) -> Result<Option<JobRecord>, StoreError> {
        self.ensure_online()?;
        Ok(self
            .lock()
            .records
            .iter()
            .find(|record| record.id == id)
            .cloned())
    }

    async fn subscribe(&self, wallet: &str) -> Result<Subscription, StoreError> {
        self.ensure_online()?;
        let wallet = wallet.to_string();
        let rx = self.updates.subscribe();
        let stream = futures_util::stream::unfold(rx, move |mut rx| {
            let wallet = wallet.clone();
            async move {
                loop {
                    match rx.recv().await {
                        Ok(record) if record.wallet_address == wallet => {
                            return Some((Ok(record), rx))
                        }
                        Ok(_) => continue,
                        Err(RecvError::Lagged(missed)) => {
                            return Some((Err(StoreError::FeedGap(missed)), rx))
                        }
                        Err(RecvError::Closed) => return None,
                    }
                }
            }
        });
        Ok(stream.boxed())
    }
}
