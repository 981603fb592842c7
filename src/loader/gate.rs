//! Concurrency gate
//!
//! Bounds how many fetches are in flight at once and optionally enforces a
//! minimum spacing between request starts.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};

use crate::metrics::record_gate_wait;

/// Counting-semaphore gate with an optional spacing clock
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Option<Arc<Semaphore>>,
    spacing: Duration,
    next_start: Arc<Mutex<Option<Instant>>>,
}

/// Slot held for the duration of one fetch; released on drop
#[derive(Debug)]
pub struct GatePermit {
    _permit: Option<OwnedSemaphorePermit>,
}

impl ConcurrencyGate {
    /// Gate allowing at most `max_in_flight` holders at once
    pub fn bounded(max_in_flight: usize) -> Self {
        Self {
            semaphore: Some(Arc::new(Semaphore::new(max_in_flight.max(1)))),
            spacing: Duration::ZERO,
            next_start: Arc::new(Mutex::new(None)),
        }
    }

    /// Gate that never blocks on concurrency
    pub fn unbounded() -> Self {
        Self {
            semaphore: None,
            spacing: Duration::ZERO,
            next_start: Arc::new(Mutex::new(None)),
        }
    }

    /// Require at least `spacing` between consecutive request starts
    pub fn with_spacing(mut self, spacing: Duration) -> Self {
        self.spacing = spacing;
        self
    }

    /// Configured spacing
    pub fn spacing(&self) -> Duration {
        self.spacing
    }

    /// Free slots, or `None` when unbounded
    pub fn available(&self) -> Option<usize> {
        self.semaphore.as_ref().map(|s| s.available_permits())
    }

    /// Wait for a slot, then for this request's start time
    pub async fn acquire(&self) -> Result<GatePermit, GateError> {
        let waited = Instant::now();

        let permit = match &self.semaphore {
            Some(semaphore) => Some(
                semaphore
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|e| GateError::Closed(e.to_string()))?,
            ),
            None => None,
        };

        if !self.spacing.is_zero() {
            // Reserve a start slot under the lock, sleep outside it
            let start_at = {
                let mut next = self.next_start.lock().await;
                let now = Instant::now();
                let start_at = match *next {
                    Some(at) if at > now => at,
                    _ => now,
                };
                *next = Some(start_at + self.spacing);
                start_at
            };
            tokio::time::sleep_until(tokio::time::Instant::from_std(start_at)).await;
        }

        record_gate_wait(waited.elapsed());
        Ok(GatePermit { _permit: permit })
    }
}

/// Gate errors
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// The semaphore was closed
    #[error("concurrency gate closed: {0}")]
    Closed(String),
}
