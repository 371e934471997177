#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Open the change feed for this wallet.
    Subscribe { wallet: crate::WalletAddress },
    /// Close the change feed.
    Unsubscribe,
    /// Read the most recent record for the wallet.
    Rediscover { wallet: crate::WalletAddress },
    /// Delete prior records for the wallet and create a pending one.
    CreateJob {
        wallet: crate::WalletAddress,
        request: u64,
    },
    /// Start polling, replacing any previous target.
    StartPolling(crate::PollTarget),
    StopPolling,
}

/// Why a create request did not produce a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartFailure {
    /// The backend already holds an active job for the wallet.
    Conflict,
    /// Cleanup or insert failed for any other reason.
    Unavailable,
}
