//! Shared models for the `converge` workspace.
//!
//! * [`network`]: the managed [`network::target::Target`] and the address that is
//!   currently used to reach it.
//! * [`config`]: tunables for watching and deploying.
//! * [`error`]: the failure taxonomy every fatal step reports through.
//!
//! The logging macros below wrap `tracing` with fixed targets so the terminal
//! formatter in the CLI can pick a symbol per message kind.

pub mod config;
pub mod error;
pub mod network;

#[doc(hidden)]
pub use tracing as __tracing;

/// Target used by [`success!`].
pub const SUCCESS_TARGET: &str = "converge::success";

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::__tracing::info!(target: "converge", $($arg)*)
    };
}

#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => {
        $crate::__tracing::info!(target: $crate::SUCCESS_TARGET, $($arg)*)
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::__tracing::warn!(target: "converge", $($arg)*)
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::__tracing::error!(target: "converge", $($arg)*)
    };
}
