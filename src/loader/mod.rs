//! Concurrent report loading
//!
//! # Overview
//!
//! 1. **Resolution**: requested keys are looked up in the [`crate::registry`]
//!    and turned into [`task::FetchTask`]s before any request is made
//! 2. **Fan-out**: [`scheduler::ReportLoader`] spawns one task per report on a `JoinSet`
//! 3. **Gating**: [`gate::ConcurrencyGate`] bounds in-flight requests and spaces their starts
//! 4. **Fan-in**: every outcome is collected, then [`crate::report::aggregate`] orders them
//!
//! # Error Handling
//!
//! Per-report failures are data inside [`crate::report::FetchOutcome`]. Only
//! problems with the call itself surface as [`LoadError`].

pub mod config;
pub mod gate;
pub mod scheduler;
pub mod task;

pub use gate::{ConcurrencyGate, GateError};
pub use scheduler::{OutcomeHook, ReportLoader};
pub use task::FetchTask;

use crate::DateRangeError;

/// Call-level load errors
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// A requested key is not in the registry
    #[error("unknown report: {0}")]
    UnknownEndpoint(String),

    /// The date range is inverted
    #[error("invalid date range: {0}")]
    InvalidDateRange(#[from] DateRangeError),

    /// A task could not acquire a slot or was cancelled externally
    #[error("scheduling failure: {0}")]
    Scheduling(String),

    /// Shutdown was requested while reports were in flight
    #[error("load cancelled")]
    Cancelled,
}
