//! Fetch outcomes, aggregation and summary statistics
//!
//! A [`FetchOutcome`] is the classified result of one report request. The
//! scheduler collects one per requested key and [`aggregate`] folds them into an
//! [`AggregatedReport`] ordered exactly as the caller asked.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;

use crate::fetcher::FailureKind;
use crate::Record;

pub mod metrics;

/// Whether a report was loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    /// Records were received
    Success,
    /// The report failed; see the error message
    Error,
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutcomeStatus::Success => f.write_str("success"),
            OutcomeStatus::Error => f.write_str("error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum OutcomeBody {
    Success { data: Vec<Record> },
    Error { kind: FailureKind, message: String },
}

/// Result of fetching one report. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    key: String,
    display_name: String,
    body: OutcomeBody,
}

impl FetchOutcome {
    /// Successful fetch carrying the received records
    pub fn success(
        key: impl Into<String>,
        display_name: impl Into<String>,
        data: Vec<Record>,
    ) -> Self {
        Self {
            key: key.into(),
            display_name: display_name.into(),
            body: OutcomeBody::Success { data },
        }
    }

    /// Failed fetch
    pub fn failure(
        key: impl Into<String>,
        display_name: impl Into<String>,
        kind: FailureKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            display_name: display_name.into(),
            body: OutcomeBody::Error {
                kind,
                message: message.into(),
            },
        }
    }

    /// Placeholder for a requested key that produced no outcome
    pub fn missing(key: impl Into<String>) -> Self {
        let key = key.into();
        Self::failure(
            key.clone(),
            key,
            FailureKind::Missing,
            "no result was produced for this report",
        )
    }

    /// Report key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Human-readable report name
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Success or error
    pub fn status(&self) -> OutcomeStatus {
        match self.body {
            OutcomeBody::Success { .. } => OutcomeStatus::Success,
            OutcomeBody::Error { .. } => OutcomeStatus::Error,
        }
    }

    /// Shorthand for `status() == Success`
    pub fn is_success(&self) -> bool {
        self.status() == OutcomeStatus::Success
    }

    /// Number of records; zero for errors
    pub fn record_count(&self) -> usize {
        self.data().len()
    }

    /// Received records; empty for errors
    pub fn data(&self) -> &[Record] {
        match &self.body {
            OutcomeBody::Success { data } => data,
            OutcomeBody::Error { .. } => &[],
        }
    }

    /// Error message, for errors only
    pub fn error_message(&self) -> Option<&str> {
        match &self.body {
            OutcomeBody::Success { .. } => None,
            OutcomeBody::Error { message, .. } => Some(message),
        }
    }

    /// Failure classification, for errors only
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match &self.body {
            OutcomeBody::Success { .. } => None,
            OutcomeBody::Error { kind, .. } => Some(*kind),
        }
    }

    /// HTTP status of a failed request, when the server answered
    pub fn http_status(&self) -> Option<u16> {
        self.failure_kind().and_then(|kind| kind.http_status())
    }
}

/// Outcomes of one load call, keyed by report key and ordered as requested
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedReport {
    generated_at: DateTime<Utc>,
    requested_keys: Vec<String>,
    outcomes: Vec<FetchOutcome>,
}

impl AggregatedReport {
    /// When the report was assembled
    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    /// Requested keys in caller order, duplicates removed
    pub fn requested_keys(&self) -> &[String] {
        &self.requested_keys
    }

    /// Outcomes in requested-key order
    pub fn outcomes(&self) -> &[FetchOutcome] {
        &self.outcomes
    }

    /// Outcome for `key`
    pub fn get(&self, key: &str) -> Option<&FetchOutcome> {
        self.outcomes.iter().find(|o| o.key() == key)
    }

    /// Number of outcomes
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// True when no reports were requested
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// Counts over an [`AggregatedReport`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ReportSummary {
    /// Reports that loaded
    pub success_count: usize,
    /// Reports that failed
    pub error_count: usize,
    /// Records across successful reports
    pub total_records: usize,
}

/// Merge outcomes into a report ordered by `requested_keys`, stamped with the current time.
pub fn aggregate<K: AsRef<str>>(
    outcomes: impl IntoIterator<Item = FetchOutcome>,
    requested_keys: &[K],
) -> AggregatedReport {
    aggregate_at(outcomes, requested_keys, Utc::now())
}

/// Same as [`aggregate`] with an explicit timestamp.
///
/// The first outcome per key wins, outcomes for keys that were not requested
/// are dropped, and every requested key without an outcome gets a
/// [`FailureKind::Missing`] error.
pub fn aggregate_at<K: AsRef<str>>(
    outcomes: impl IntoIterator<Item = FetchOutcome>,
    requested_keys: &[K],
    generated_at: DateTime<Utc>,
) -> AggregatedReport {
    let requested_keys = dedup_keys(requested_keys);

    let mut slots: Vec<Option<FetchOutcome>> = vec![None; requested_keys.len()];
    for outcome in outcomes {
        if let Some(pos) = requested_keys.iter().position(|k| k == outcome.key()) {
            if slots[pos].is_none() {
                slots[pos] = Some(outcome);
            }
        }
    }

    let outcomes = slots
        .into_iter()
        .zip(&requested_keys)
        .map(|(slot, key)| slot.unwrap_or_else(|| FetchOutcome::missing(key.clone())))
        .collect();

    AggregatedReport {
        generated_at,
        requested_keys,
        outcomes,
    }
}

/// Success and error counts plus the total number of records.
pub fn summarize(report: &AggregatedReport) -> ReportSummary {
    report
        .outcomes()
        .iter()
        .fold(ReportSummary::default(), |mut summary, outcome| {
            match outcome.status() {
                OutcomeStatus::Success => {
                    summary.success_count += 1;
                    summary.total_records += outcome.record_count();
                }
                OutcomeStatus::Error => summary.error_count += 1,
            }
            summary
        })
}

/// Keys in first-occurrence order
pub(crate) fn dedup_keys<K: AsRef<str>>(keys: &[K]) -> Vec<String> {
    let mut seen = HashSet::new();
    keys.iter()
        .map(|k| k.as_ref())
        .filter(|k| seen.insert(*k))
        .map(str::to_string)
        .collect()
}
