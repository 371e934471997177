use serde_json::Value;

use crate::{JobId, JobStatus, WalletAddress};

/// Non-critical, dismissible conditions shown next to the lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    WalletNotConnected,
    /// The backend already has an active job for this wallet.
    Conflict,
    StartFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn new(kind: NoticeKind) -> Self {
        let message = match kind {
            NoticeKind::WalletNotConnected => "Wallet not connected",
            NoticeKind::Conflict => "A request is already in progress for this wallet.",
            NoticeKind::StartFailed => "Failed to start generation. Please try again.",
        };
        Self {
            kind,
            message: message.to_string(),
        }
    }
}

/// Read-only snapshot handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatusView {
    pub wallet: Option<WalletAddress>,
    pub status: JobStatus,
    pub job_id: Option<JobId>,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub notice: Option<Notice>,
    /// A create request is outstanding.
    pub creating: bool,
    pub dirty: bool,
}
