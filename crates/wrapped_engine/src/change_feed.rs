use std::sync::Arc;

use futures_util::StreamExt;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use wrapped_logging::{short_wallet, wrapped_debug, wrapped_info, wrapped_warn};

use crate::store::{EventSink, JobStore};
use crate::{EngineEvent, Source};

/// Open change-feed subscription. Dropping the guard closes it, including
/// while the subscription is still being set up.
pub struct ChangeFeedGuard {
    cancel: CancellationToken,
}

impl ChangeFeedGuard {
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for ChangeFeedGuard {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Subscribes to updates for `wallet` and forwards every record to `sink`.
///
/// Subscription failures are logged and not retried; polling covers the gap.
pub fn spawn_change_feed(
    runtime: &Handle,
    store: Arc<dyn JobStore>,
    wallet: String,
    sink: Arc<dyn EventSink>,
) -> ChangeFeedGuard {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    runtime.spawn(async move {
        let subscribed = tokio::select! {
            _ = token.cancelled() => return,
            subscribed = store.subscribe(&wallet) => subscribed,
        };
        let mut updates = match subscribed {
            Ok(updates) => updates,
            Err(err) => {
                wrapped_warn!(
                    "Change feed for {} unavailable, relying on polling: {}",
                    short_wallet(&wallet),
                    err
                );
                return;
            }
        };
        wrapped_info!("Change feed open for {}", short_wallet(&wallet));
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                next = updates.next() => match next {
                    Some(Ok(record)) => {
                        wrapped_debug!("Change feed update job={} status={}", record.id, record.status);
                        sink.emit(EngineEvent::Snapshot {
                            source: Source::ChangeFeed,
                            record,
                        });
                    }
                    Some(Err(err)) => {
                        wrapped_warn!("Change feed error for {}: {}", short_wallet(&wallet), err);
                    }
                    None => {
                        wrapped_info!("Change feed for {} ended", short_wallet(&wallet));
                        break;
                    }
                },
            }
        }
        wrapped_debug!("Change feed for {} closed", short_wallet(&wallet));
    });
    ChangeFeedGuard { cancel }
}
