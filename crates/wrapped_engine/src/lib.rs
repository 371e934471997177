//! Wrapped engine: job store access, change feed, poll loop and job creation.
mod change_feed;
mod engine;
mod error;
mod initiator;
mod memory;
mod poll;
mod rest;
mod store;
mod types;

pub use change_feed::{spawn_change_feed, ChangeFeedGuard};
pub use engine::{EngineHandle, EngineSettings};
pub use error::{CreateError, StoreError};
pub use initiator::RequestInitiator;
pub use memory::MemoryJobStore;
pub use poll::{spawn_poll_loop, PollHandle};
pub use rest::{RestJobStore, RestSettings};
pub use store::{ChannelEventSink, EventSink, JobStore, Subscription};
pub use types::{
    EngineEvent, JobId, JobRecord, NewJob, PollTarget, RecordError, RecordStatus, Source,
};
