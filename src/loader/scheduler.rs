//! Fan-out/fan-in scheduler

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn, Instrument};

use super::config::{DEFAULT_MAX_CONCURRENCY, DEFAULT_REQUEST_TIMEOUT};
use super::gate::{ConcurrencyGate, GateError};
use super::task::FetchTask;
use super::LoadError;
use crate::config::{ApiToken, LoaderConfig, DEFAULT_BASE_URL};
use crate::fetcher::{FailureKind, RequestCapability};
use crate::registry::EndpointRegistry;
use crate::report::{self, dedup_keys, AggregatedReport, FetchOutcome};
use crate::shutdown::{self, SharedShutdown};
use crate::DateRange;

/// Callback observing each outcome as its task finishes
pub type OutcomeHook = Arc<dyn Fn(&FetchOutcome) + Send + Sync>;

/// Loads several reports concurrently and aggregates the results
pub struct ReportLoader {
    registry: Arc<EndpointRegistry>,
    capability: Arc<dyn RequestCapability>,
    token: ApiToken,
    base_url: String,
    request_timeout: Duration,
    max_concurrency: Option<usize>,
    request_delay: Duration,
    shutdown: Option<SharedShutdown>,
    outcome_hook: Option<OutcomeHook>,
}

impl ReportLoader {
    /// Create a loader with default settings
    pub fn new(
        registry: Arc<EndpointRegistry>,
        capability: Arc<dyn RequestCapability>,
        token: ApiToken,
    ) -> Self {
        Self {
            registry,
            capability,
            token,
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_concurrency: Some(DEFAULT_MAX_CONCURRENCY),
            request_delay: Duration::ZERO,
            shutdown: shutdown::get_global_shutdown(),
            outcome_hook: None,
        }
    }

    /// Create a loader from a [`LoaderConfig`]
    pub fn from_config(
        registry: Arc<EndpointRegistry>,
        capability: Arc<dyn RequestCapability>,
        token: ApiToken,
        config: &LoaderConfig,
    ) -> Self {
        Self::new(registry, capability, token)
            .with_base_url(config.base_url.clone())
            .with_request_timeout(config.request_timeout)
            .with_max_concurrency(config.max_concurrency)
            .with_request_delay(config.request_delay)
    }

    /// Override the API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the per-request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Allow at most `max` reports in flight (values below 1 act as 1)
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = Some(max.max(1));
        self
    }

    /// Remove the in-flight bound
    pub fn with_unbounded_concurrency(mut self) -> Self {
        self.max_concurrency = None;
        self
    }

    /// Minimum spacing between request starts
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Attach a shared shutdown handle for cancellation
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Observe outcomes as they complete
    pub fn with_outcome_hook(mut self, hook: OutcomeHook) -> Self {
        self.outcome_hook = Some(hook);
        self
    }

    /// Configured in-flight bound
    pub fn max_concurrency(&self) -> Option<usize> {
        self.max_concurrency
    }

    /// Registry used for key resolution
    pub fn registry(&self) -> &Arc<EndpointRegistry> {
        &self.registry
    }

    /// Fetch every requested report and aggregate the results.
    ///
    /// The range and all keys are validated before any request is issued.
    /// Duplicate keys are fetched once. Individual report failures are recorded
    /// in the returned report; only call-level problems produce an error.
    pub async fn load_reports<K: AsRef<str>>(
        &self,
        keys: &[K],
        range: &DateRange,
    ) -> Result<AggregatedReport, LoadError> {
        range.validate()?;

        let requested = dedup_keys(keys);
        let tasks = requested
            .iter()
            .map(|key| {
                let endpoint = self
                    .registry
                    .lookup(key)
                    .map_err(|_| LoadError::UnknownEndpoint(key.clone()))?;
                Ok(FetchTask::new(
                    endpoint,
                    &self.base_url,
                    range,
                    self.token.clone(),
                    self.request_timeout,
                ))
            })
            .collect::<Result<Vec<_>, LoadError>>()?;

        let span = tracing::info_span!(
            "load_reports",
            reports = requested.len(),
            range = %range,
        );

        async {
            info!(keys = ?requested, "Starting report load");
            let outcomes = self.run_tasks(tasks).await?;
            let report = report::aggregate(outcomes, &requested);
            let summary = report::summarize(&report);
            info!(
                succeeded = summary.success_count,
                failed = summary.error_count,
                records = summary.total_records,
                "Report load finished"
            );
            Ok::<_, LoadError>(report)
        }
        .instrument(span)
        .await
    }

    async fn run_tasks(&self, tasks: Vec<FetchTask>) -> Result<Vec<FetchOutcome>, LoadError> {
        if self.shutdown_requested() {
            info!("Shutdown already requested, not starting any report");
            return Err(LoadError::Cancelled);
        }

        let gate = match self.max_concurrency {
            Some(max) => ConcurrencyGate::bounded(max),
            None => ConcurrencyGate::unbounded(),
        }
        .with_spacing(self.request_delay);

        let mut outcomes = Vec::with_capacity(tasks.len());
        let mut pending = HashMap::with_capacity(tasks.len());
        let mut set = JoinSet::new();

        for task in tasks {
            let capability = Arc::clone(&self.capability);
            let gate = gate.clone();
            let names = (task.key().to_string(), task.display_name().to_string());
            let handle = set.spawn(
                async move {
                    let _permit = gate.acquire().await?;
                    Ok::<_, GateError>(task.run(capability.as_ref()).await)
                }
                .in_current_span(),
            );
            pending.insert(handle.id(), names);
        }
        debug!(spawned = set.len(), "Report tasks spawned");

        loop {
            let joined = match &self.shutdown {
                Some(shutdown) => tokio::select! {
                    biased;
                    _ = shutdown.wait_for_shutdown() => {
                        warn!(in_flight = set.len(), "Shutdown requested, aborting report tasks");
                        set.abort_all();
                        return Err(LoadError::Cancelled);
                    }
                    joined = set.join_next_with_id() => joined,
                },
                None => set.join_next_with_id().await,
            };

            let Some(joined) = joined else { break };

            let outcome = match joined {
                Ok((id, Ok(outcome))) => {
                    pending.remove(&id);
                    outcome
                }
                Ok((_, Err(e))) => {
                    error!(error = %e, "Report task could not acquire a slot");
                    set.abort_all();
                    return Err(LoadError::Scheduling(e.to_string()));
                }
                Err(e) if e.is_panic() => {
                    let Some((key, name)) = pending.remove(&e.id()) else {
                        set.abort_all();
                        return Err(LoadError::Scheduling(e.to_string()));
                    };
                    let message =
                        format!("report task panicked: {}", panic_message(e.into_panic()));
                    error!(report = %key, error = %message, "Report task panicked");
                    FetchOutcome::failure(key, name, FailureKind::TaskPanicked, message)
                }
                Err(e) => {
                    error!(error = %e, "Report task failed to complete");
                    set.abort_all();
                    return Err(LoadError::Scheduling(e.to_string()));
                }
            };

            if let Some(hook) = &self.outcome_hook {
                hook(&outcome);
            }
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .map(|s| s.is_shutdown_requested())
            .unwrap_or(false)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(message) => (*message).to_string(),
            Err(_) => "non-string panic payload".to_string(),
        },
    }
}

impl std::fmt::Debug for ReportLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportLoader")
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .field("max_concurrency", &self.max_concurrency)
            .field("request_delay", &self.request_delay)
            .field("endpoints", &self.registry.len())
            .finish()
    }
}
