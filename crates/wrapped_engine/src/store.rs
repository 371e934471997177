use futures_util::stream::BoxStream;

use crate::{CreateError, EngineEvent, JobRecord, NewJob, StoreError};

/// Update notifications for one wallet. Dropping the stream releases the
/// underlying subscription.
pub type Subscription = BoxStream<'static, Result<JobRecord, StoreError>>;

/// Persisted job table. Every call may fail with a transport error.
#[async_trait::async_trait]
pub trait JobStore: Send + Sync {
    async fn create(&self, job: NewJob) -> Result<JobRecord, CreateError>;

    /// Removes every record for `wallet`, returning how many were removed.
    async fn delete_by_wallet(&self, wallet: &str) -> Result<usize, StoreError>;

    /// Most recent record for `wallet` by `created_at`.
    async fn read_latest(&self, wallet: &str) -> Result<Option<JobRecord>, StoreError>;

    async fn read_by_id(&self, id: &str) -> Result<Option<JobRecord>, StoreError>;

    /// Update events for records owned by `wallet`. No ordering guarantee,
    /// duplicates possible, updates before the call are not replayed.
    async fn subscribe(&self, wallet: &str) -> Result<Subscription, StoreError>;
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelEventSink {
    tx: std::sync::mpsc::Sender<EngineEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: std::sync::mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}
