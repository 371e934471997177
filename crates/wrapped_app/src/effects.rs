use std::sync::{mpsc, Arc};

use wrapped_core::{Effect, JobId, JobPhase, JobSnapshot, Msg, SnapshotSource, StartFailure};
use wrapped_engine::{
    CreateError, EngineEvent, EngineHandle, EngineSettings, EventSink, JobRecord, JobStore,
    RecordError, RecordStatus, Source,
};
use wrapped_logging::{short_wallet, wrapped_debug, wrapped_info, wrapped_warn};

/// Shown for failed records that carry no message of their own.
pub const DEFAULT_FAILURE_MESSAGE: &str = "Processing failed";

/// Carries out core effects on the engine.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(
        store: Arc<dyn JobStore>,
        settings: EngineSettings,
        msg_tx: mpsc::Sender<Msg>,
    ) -> Self {
        let engine = EngineHandle::new(store, settings, Arc::new(MsgSink::new(msg_tx)));
        Self { engine }
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Subscribe { wallet } => {
                    wrapped_info!("Subscribe wallet={}", short_wallet(&wallet));
                    self.engine.subscribe(wallet);
                }
                Effect::Unsubscribe => self.engine.unsubscribe(),
                Effect::Rediscover { wallet } => self.engine.rediscover(wallet),
                Effect::CreateJob { wallet, request } => {
                    wrapped_info!(
                        "CreateJob wallet={} request={}",
                        short_wallet(&wallet),
                        request
                    );
                    self.engine.create_job(wallet, request);
                }
                Effect::StartPolling(target) => {
                    self.engine.start_polling(wrapped_engine::PollTarget {
                        wallet: target.wallet,
                        job_id: target.job_id.map(|id| id.as_str().to_string()),
                    });
                }
                Effect::StopPolling => self.engine.stop_polling(),
            }
        }
    }
}

/// Turns engine events into core messages on the app's message channel.
pub struct MsgSink {
    tx: mpsc::Sender<Msg>,
}

impl MsgSink {
    pub fn new(tx: mpsc::Sender<Msg>) -> Self {
        Self { tx }
    }
}

impl EventSink for MsgSink {
    fn emit(&self, event: EngineEvent) {
        if let Some(msg) = to_msg(event) {
            let _ = self.tx.send(msg);
        }
    }
}

/// Maps an engine event to a core message. Malformed records are dropped.
pub fn to_msg(event: EngineEvent) -> Option<Msg> {
    match event {
        EngineEvent::Snapshot { source, record } => match to_snapshot(record) {
            Ok(snapshot) => Some(Msg::SnapshotReceived {
                source: map_source(source),
                snapshot,
            }),
            Err(err) => {
                wrapped_warn!("Dropping {:?} update: {}", source, err);
                None
            }
        },
        EngineEvent::Rediscovered { wallet, record } => {
            let snapshot = match record.map(to_snapshot).transpose() {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    wrapped_warn!(
                        "Dropping rediscovered record for {}: {}",
                        short_wallet(&wallet),
                        err
                    );
                    return None;
                }
            };
            Some(Msg::Rediscovered { wallet, snapshot })
        }
        EngineEvent::JobCreated { request, record } => match to_snapshot(record) {
            Ok(snapshot) => Some(Msg::JobCreated { request, snapshot }),
            Err(err) => {
                wrapped_warn!("Created record is malformed: {}", err);
                Some(Msg::CreateFailed {
                    request,
                    failure: StartFailure::Unavailable,
                })
            }
        },
        EngineEvent::CreateFailed { request, error } => {
            wrapped_debug!("Create request {} failed: {}", request, error);
            Some(Msg::CreateFailed {
                request,
                failure: map_failure(&error),
            })
        }
    }
}

pub fn to_snapshot(record: JobRecord) -> Result<JobSnapshot, RecordError> {
    record.ensure_well_formed()?;
    let phase = match record.status {
        RecordStatus::Pending => JobPhase::Pending,
        RecordStatus::Processing => JobPhase::Processing,
        RecordStatus::Completed => match record.result {
            Some(result) => JobPhase::Completed(result),
            None => return Err(RecordError::MissingResult { id: record.id }),
        },
        RecordStatus::Failed => JobPhase::Failed(
            record
                .error_message
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string()),
        ),
    };
    Ok(JobSnapshot {
        id: JobId::new(record.id),
        wallet: record.wallet_address,
        phase,
        created_at: record.created_at,
    })
}

fn map_source(source: Source) -> SnapshotSource {
    match source {
        Source::ChangeFeed => SnapshotSource::ChangeFeed,
        Source::Poll => SnapshotSource::Poll,
    }
}

fn map_failure(error: &CreateError) -> StartFailure {
    if error.is_conflict() {
        StartFailure::Conflict
    } else {
        StartFailure::Unavailable
    }
}
