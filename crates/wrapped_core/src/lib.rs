//! Wrapped core: pure lifecycle reconciler and view-model helpers.
mod effect;
mod msg;
mod state;
mod update;
mod view_model;

pub use effect::{Effect, StartFailure};
pub use msg::Msg;
pub use state::{
    AppState, JobId, JobPhase, JobSnapshot, JobStatus, PollTarget, SnapshotSource, WalletAddress,
};
pub use update::update;
pub use view_model::{Notice, NoticeKind, StatusView};
