use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::view_model::{Notice, NoticeKind, StatusView};

/// Wallet addresses are opaque to the core; equality is all that matters.
pub type WalletAddress = String;

/// Opaque job identity assigned by the job store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Lifecycle status exposed to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobStatus {
    #[default]
    Idle,
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// True while the backend may still change the record.
    pub fn is_live(self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Processing)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Idle => "idle",
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    fn rank(self) -> u8 {
        match self {
            JobStatus::Idle => 0,
            JobStatus::Pending => 1,
            JobStatus::Processing => 2,
            JobStatus::Completed | JobStatus::Failed => 3,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a tracked job together with the payload that status carries.
///
/// A result only exists for `Completed` and an error only for `Failed`, so
/// the payload invariant holds by construction.
#[derive(Debug, Clone, PartialEq)]
pub enum JobPhase {
    Pending,
    Processing,
    Completed(Value),
    Failed(String),
}

impl JobPhase {
    pub fn status(&self) -> JobStatus {
        match self {
            JobPhase::Pending => JobStatus::Pending,
            JobPhase::Processing => JobStatus::Processing,
            JobPhase::Completed(_) => JobStatus::Completed,
            JobPhase::Failed(_) => JobStatus::Failed,
        }
    }

    /// Forward-only: terminal phases are sticky and ranks never decrease.
    fn admits(&self, next: &JobPhase) -> bool {
        let current = self.status();
        if current.is_terminal() {
            return false;
        }
        next.status().rank() >= current.rank()
    }
}

/// Point-in-time view of a job record, as observed by a producer.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSnapshot {
    pub id: JobId,
    pub wallet: WalletAddress,
    pub phase: JobPhase,
    pub created_at: DateTime<Utc>,
}

/// Which producer delivered a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSource {
    ChangeFeed,
    Poll,
}

/// What the poll loop should be reading while a job is live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollTarget {
    pub wallet: WalletAddress,
    pub job_id: Option<JobId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Binding {
    /// Seeded by a successful create request.
    Created,
    /// Bound by a rediscovery lookup; may be rebound to a newer record.
    Discovered { created_at: DateTime<Utc> },
    /// Bound by the first producer snapshot seen while nothing was tracked.
    Observed,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TrackedJob {
    pub(crate) id: JobId,
    pub(crate) binding: Binding,
    pub(crate) phase: JobPhase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Rejection {
    NoWallet,
    WalletMismatch,
    RetiredId,
    CreateInFlight,
    IdMismatch,
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Acceptance {
    /// Identity was bound to the snapshot's id.
    Adopted,
    /// Identity was moved to a newer discovered record.
    Rebound,
    /// The tracked job moved forward.
    Advanced,
    /// Same state as already held.
    Unchanged,
    Rejected(Rejection),
}

/// Authoritative view of the current job for the connected wallet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    wallet: Option<WalletAddress>,
    job: Option<TrackedJob>,
    retired: BTreeSet<JobId>,
    creating: Option<u64>,
    next_request: u64,
    notice: Option<Notice>,
    poll_target: Option<PollTarget>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> StatusView {
        let (result, error) = match self.job.as_ref().map(|job| &job.phase) {
            Some(JobPhase::Completed(result)) => (Some(result.clone()), None),
            Some(JobPhase::Failed(error)) => (None, Some(error.clone())),
            _ => (None, None),
        };
        StatusView {
            wallet: self.wallet.clone(),
            status: self.status(),
            job_id: self.tracked_job_id().cloned(),
            result,
            error,
            notice: self.notice.clone(),
            creating: self.creating.is_some(),
            dirty: self.dirty,
        }
    }

    pub fn status(&self) -> JobStatus {
        self.job
            .as_ref()
            .map_or(JobStatus::Idle, |job| job.phase.status())
    }

    pub fn tracked_job_id(&self) -> Option<&JobId> {
        self.job.as_ref().map(|job| &job.id)
    }

    pub fn wallet(&self) -> Option<&str> {
        self.wallet.as_deref()
    }

    /// Returns whether the view changed since the last call, clearing the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn creating(&self) -> Option<u64> {
        self.creating
    }

    pub(crate) fn poll_target(&self) -> Option<&PollTarget> {
        self.poll_target.as_ref()
    }

    pub(crate) fn set_poll_target(&mut self, target: Option<PollTarget>) {
        self.poll_target = target;
    }

    /// Poll target implied by the current lifecycle state.
    pub(crate) fn desired_poll_target(&self) -> Option<PollTarget> {
        let wallet = self.wallet.as_ref()?;
        let job = self.job.as_ref()?;
        if !job.phase.status().is_live() {
            return None;
        }
        Some(PollTarget {
            wallet: wallet.clone(),
            job_id: Some(job.id.clone()),
        })
    }

    /// Drops everything tied to the current wallet session.
    ///
    /// The request counter survives so late create replies from an earlier
    /// session can never match a new request.
    pub(crate) fn reset_session(&mut self, wallet: Option<WalletAddress>) {
        let next_request = self.next_request;
        *self = Self {
            wallet,
            next_request,
            ..Self::default()
        };
        self.dirty = true;
    }

    pub(crate) fn set_notice(&mut self, kind: NoticeKind) {
        self.notice = Some(Notice::new(kind));
        self.dirty = true;
    }

    pub(crate) fn clear_notice(&mut self) -> bool {
        let had_notice = self.notice.take().is_some();
        if had_notice {
            self.dirty = true;
        }
        had_notice
    }

    /// Retires the tracked job so nothing tagged with its id is accepted again.
    fn retire_tracked(&mut self) {
        if let Some(job) = self.job.take() {
            self.retired.insert(job.id);
            self.dirty = true;
        }
    }

    /// Tears down tracking and records an outstanding create request.
    pub(crate) fn begin_create(&mut self) -> u64 {
        self.retire_tracked();
        let request = self.next_request;
        self.next_request += 1;
        self.creating = Some(request);
        self.dirty = true;
        request
    }

    /// Seeds identity from a successful create. Returns false for replies to
    /// requests that are no longer outstanding.
    pub(crate) fn finish_create(&mut self, request: u64, snapshot: &JobSnapshot) -> bool {
        if self.creating != Some(request) {
            return false;
        }
        self.creating = None;
        self.dirty = true;
        if self.wallet.as_deref() != Some(snapshot.wallet.as_str()) {
            return false;
        }
        self.job = Some(TrackedJob {
            id: snapshot.id.clone(),
            binding: Binding::Created,
            phase: JobPhase::Pending,
        });
        true
    }

    pub(crate) fn abort_create(&mut self, request: u64) -> bool {
        if self.creating != Some(request) {
            return false;
        }
        self.creating = None;
        self.dirty = true;
        true
    }

    /// Explicit retry after a failure: back to idle so a new job can start.
    pub(crate) fn clear_failed(&mut self) -> bool {
        if self.status() != JobStatus::Failed {
            return false;
        }
        self.retire_tracked();
        true
    }

    /// Common admission checks shared by producer snapshots and rediscovery.
    fn admit(&self, snapshot: &JobSnapshot) -> Result<(), Rejection> {
        let wallet = self.wallet.as_deref().ok_or(Rejection::NoWallet)?;
        if snapshot.wallet != wallet {
            return Err(Rejection::WalletMismatch);
        }
        if self.retired.contains(&snapshot.id) {
            return Err(Rejection::RetiredId);
        }
        if self.job.is_none() && self.creating.is_some() {
            return Err(Rejection::CreateInFlight);
        }
        Ok(())
    }

    /// Acceptance rule for snapshots from the change feed and the poll loop.
    pub(crate) fn apply_snapshot(&mut self, snapshot: JobSnapshot) -> Acceptance {
        if let Err(rejection) = self.admit(&snapshot) {
            return Acceptance::Rejected(rejection);
        }
        let Some(job) = self.job.as_mut() else {
            self.job = Some(TrackedJob {
                id: snapshot.id,
                binding: Binding::Observed,
                phase: snapshot.phase,
            });
            self.dirty = true;
            return Acceptance::Adopted;
        };
        if job.id != snapshot.id {
            return Acceptance::Rejected(Rejection::IdMismatch);
        }
        if job.phase == snapshot.phase {
            return Acceptance::Unchanged;
        }
        if !job.phase.admits(&snapshot.phase) {
            return Acceptance::Rejected(Rejection::Stale);
        }
        job.phase = snapshot.phase;
        self.dirty = true;
        Acceptance::Advanced
    }

    /// Result of a "most recent record for wallet" lookup.
    ///
    /// Racing lookups resolve to the greatest `created_at`: a discovered
    /// binding is replaced by a strictly newer record. Bindings from a create
    /// or from a producer are never replaced here.
    pub(crate) fn apply_rediscovery(&mut self, snapshot: JobSnapshot) -> Acceptance {
        if let Err(rejection) = self.admit(&snapshot) {
            return Acceptance::Rejected(rejection);
        }
        if self.tracked_job_id() == Some(&snapshot.id) {
            return self.apply_snapshot(snapshot);
        }
        let created_at = snapshot.created_at;
        let newer = match self.job.as_ref() {
            None => true,
            Some(job) => match job.binding {
                Binding::Discovered { created_at: bound_at } => created_at > bound_at,
                Binding::Created | Binding::Observed => false,
            },
        };
        if !newer {
            return Acceptance::Rejected(Rejection::IdMismatch);
        }
        let outcome = if self.job.is_some() {
            Acceptance::Rebound
        } else {
            Acceptance::Adopted
        };
        self.job = Some(TrackedJob {
            id: snapshot.id,
            binding: Binding::Discovered { created_at },
            phase: snapshot.phase,
        });
        self.dirty = true;
        outcome
    }
}
