#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// A wallet was connected (or switched to).
    WalletConnected(crate::WalletAddress),
    /// The wallet was disconnected or the view was disposed.
    WalletDisconnected,
    /// User asked for a new report.
    StartClicked,
    /// User clicked retry on the failure state.
    RetryClicked,
    /// User dismissed the current notice.
    DismissNotice,
    /// Result of the "most recent record for wallet" lookup.
    Rediscovered {
        wallet: crate::WalletAddress,
        snapshot: Option<crate::JobSnapshot>,
    },
    /// A producer observed a record.
    SnapshotReceived {
        source: crate::SnapshotSource,
        snapshot: crate::JobSnapshot,
    },
    /// The initiator created a record for `request`.
    JobCreated {
        request: u64,
        snapshot: crate::JobSnapshot,
    },
    /// The initiator could not create a record for `request`.
    CreateFailed {
        request: u64,
        failure: crate::StartFailure,
    },
}
