use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use wrapped_logging::{short_wallet, wrapped_debug, wrapped_trace, wrapped_warn};

use crate::store::{EventSink, JobStore};
use crate::{EngineEvent, JobRecord, PollTarget, Source, StoreError};

/// Running poll loop. Dropping the handle stops it.
pub struct PollHandle {
    cancel: CancellationToken,
}

impl PollHandle {
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Reads `target` once per `interval` and forwards what it finds to `sink`.
///
/// The first read happens one interval after the start. Read failures are
/// logged and the loop keeps going; a well-formed terminal record ends it.
pub fn spawn_poll_loop(
    runtime: &Handle,
    store: Arc<dyn JobStore>,
    target: PollTarget,
    interval: Duration,
    sink: Arc<dyn EventSink>,
) -> PollHandle {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    runtime.spawn(async move {
        let mut ticker = time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        wrapped_debug!(
            "Polling {} job={:?} every {:?}",
            short_wallet(&target.wallet),
            target.job_id,
            interval
        );
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }
            let read = tokio::select! {
                _ = token.cancelled() => break,
                read = read_target(store.as_ref(), &target) => read,
            };
            match read {
                Ok(Some(record)) => {
                    // A completed row whose payload is not written yet is read again.
                    let settled =
                        record.status.is_terminal() && record.ensure_well_formed().is_ok();
                    sink.emit(EngineEvent::Snapshot {
                        source: Source::Poll,
                        record,
                    });
                    if settled {
                        wrapped_debug!("Poll observed terminal status, stopping");
                        break;
                    }
                }
                Ok(None) => wrapped_trace!("Poll found no record for {:?}", target.job_id),
                Err(err) => wrapped_warn!("Poll read failed, will retry: {}", err),
            }
        }
    });
    PollHandle { cancel }
}

async fn read_target(
    store: &dyn JobStore,
    target: &PollTarget,
) -> Result<Option<JobRecord>, StoreError> {
    match &target.job_id {
        Some(id) => store.read_by_id(id).await,
        None => store.read_latest(&target.wallet).await,
    }
}
