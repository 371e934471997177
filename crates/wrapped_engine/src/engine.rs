use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use tokio::runtime::Runtime;
use tokio_util::sync::{CancellationToken, DropGuard};
use wrapped_logging::{short_wallet, wrapped_debug, wrapped_warn};

use crate::change_feed::{spawn_change_feed, ChangeFeedGuard};
use crate::initiator::RequestInitiator;
use crate::poll::{spawn_poll_loop, PollHandle};
use crate::store::{EventSink, JobStore};
use crate::{EngineEvent, PollTarget};

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub poll_interval: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
        }
    }
}

enum EngineCommand {
    Subscribe { wallet: String },
    Unsubscribe,
    StartPolling(PollTarget),
    StopPolling,
    Rediscover { wallet: String },
    CreateJob { wallet: String, request: u64 },
}

/// Producers owned by the engine thread; at most one of each.
#[derive(Default)]
struct Producers {
    feed: Option<ChangeFeedGuard>,
    poll: Option<PollHandle>,
    rediscovery: Option<DropGuard>,
}

/// Runs store IO on a dedicated runtime thread and reports through `sink`.
///
/// Dropping the handle stops the thread, which drops the open change feed
/// and poll loop on the way out.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
}

impl EngineHandle {
    pub fn new(
        store: Arc<dyn JobStore>,
        settings: EngineSettings,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();

        thread::spawn(move || {
            let runtime = Runtime::new().expect("tokio runtime");
            let mut producers = Producers::default();
            while let Ok(command) = cmd_rx.recv() {
                handle_command(&runtime, &store, &settings, &sink, &mut producers, command);
            }
            drop(producers);
            wrapped_debug!("Engine command loop finished");
        });

        Self { cmd_tx }
    }

    pub fn subscribe(&self, wallet: impl Into<String>) {
        self.send(EngineCommand::Subscribe {
            wallet: wallet.into(),
        });
    }

    pub fn unsubscribe(&self) {
        self.send(EngineCommand::Unsubscribe);
    }

    pub fn start_polling(&self, target: PollTarget) {
        self.send(EngineCommand::StartPolling(target));
    }

    pub fn stop_polling(&self) {
        self.send(EngineCommand::StopPolling);
    }

    pub fn rediscover(&self, wallet: impl Into<String>) {
        self.send(EngineCommand::Rediscover {
            wallet: wallet.into(),
        });
    }

    pub fn create_job(&self, wallet: impl Into<String>, request: u64) {
        self.send(EngineCommand::CreateJob {
            wallet: wallet.into(),
            request,
        });
    }

    fn send(&self, command: EngineCommand) {
        if self.cmd_tx.send(command).is_err() {
            wrapped_warn!("Engine thread is gone; command dropped");
        }
    }
}

fn handle_command(
    runtime: &Runtime,
    store: &Arc<dyn JobStore>,
    settings: &EngineSettings,
    sink: &Arc<dyn EventSink>,
    producers: &mut Producers,
    command: EngineCommand,
) {
    match command {
        EngineCommand::Subscribe { wallet } => {
            // Replacing the guard closes the previous subscription.
            producers.feed = Some(spawn_change_feed(
                runtime.handle(),
                store.clone(),
                wallet,
                sink.clone(),
            ));
        }
        EngineCommand::Unsubscribe => {
            producers.feed = None;
            producers.rediscovery = None;
        }
        EngineCommand::StartPolling(target) => {
            producers.poll = Some(spawn_poll_loop(
                runtime.handle(),
                store.clone(),
                target,
                settings.poll_interval,
                sink.clone(),
            ));
        }
        EngineCommand::StopPolling => {
            producers.poll = None;
        }
        EngineCommand::Rediscover { wallet } => {
            let cancel = CancellationToken::new();
            let token = cancel.clone();
            let store = store.clone();
            let sink = sink.clone();
            let retry = settings.poll_interval;
            runtime.spawn(async move {
                tokio::select! {
                    _ = token.cancelled() => {}
                    _ = rediscover(store.as_ref(), wallet, retry, sink.as_ref()) => {}
                }
            });
            producers.rediscovery = Some(cancel.drop_guard());
        }
        EngineCommand::CreateJob { wallet, request } => {
            let initiator = RequestInitiator::new(store.clone());
            let sink = sink.clone();
            runtime.spawn(async move {
                let event = match initiator.start(&wallet).await {
                    Ok(record) => EngineEvent::JobCreated { request, record },
                    Err(error) => EngineEvent::CreateFailed { request, error },
                };
                sink.emit(event);
            });
        }
    }
}

/// Reads the latest record for `wallet`. A completed record without its
/// payload is read again every `retry` until the payload shows up.
async fn rediscover(store: &dyn JobStore, wallet: String, retry: Duration, sink: &dyn EventSink) {
    loop {
        match store.read_latest(&wallet).await {
            Ok(Some(record)) if record.ensure_well_formed().is_err() => {
                wrapped_debug!(
                    "Latest job {} for {} has no result yet, reading again",
                    record.id,
                    short_wallet(&wallet)
                );
                tokio::time::sleep(retry).await;
            }
            Ok(record) => {
                sink.emit(EngineEvent::Rediscovered { wallet, record });
                return;
            }
            Err(err) => {
                wrapped_warn!(
                    "Rediscovery for {} failed: {}",
                    short_wallet(&wallet),
                    err
                );
                return;
            }
        }
    }
}
