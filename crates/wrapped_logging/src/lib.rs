#![deny(missing_docs)]
//! Shared logging utilities for the wrapped workspace.
//!
//! This crate provides the `wrapped_*` logging macros used across the codebase,
//! a helper that keeps wallet addresses short in log lines, and a minimal test
//! initializer for the global logger.

/// Number of characters kept at each end of a redacted wallet address.
const WALLET_EDGE: usize = 4;

/// Shortens a wallet address for log output, e.g. `7xKX…9fQa`.
///
/// Addresses short enough to not benefit from shortening are returned as-is.
pub fn short_wallet(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= WALLET_EDGE * 2 + 1 {
        return address.to_string();
    }
    let head: String = chars[..WALLET_EDGE].iter().collect();
    let tail: String = chars[chars.len() - WALLET_EDGE..].iter().collect();
    format!("{head}…{tail}")
}

/// Per-tick and per-record detail; off outside debugging.
#[macro_export]
macro_rules! wrapped_trace {
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Lifecycle milestones such as a job being created.
#[macro_export]
macro_rules! wrapped_info {
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Transitions and rejected snapshots.
#[macro_export]
macro_rules! wrapped_debug {
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Recoverable store and transport failures.
#[macro_export]
macro_rules! wrapped_warn {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Failures the sync engine cannot recover from.
#[macro_export]
macro_rules! wrapped_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Terminal logger for tests. Later calls, from other tests in the same
/// binary, are ignored.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
