//! Classification of per-report failures.
//!
//! Every failed report carries a [`FailureKind`] next to its message so the
//! summary can print a short description and a remediation hint, and the HTTP
//! client can decide whether a retry makes sense.

use super::TransportError;
use serde::Serialize;

/// Coarse failure family, matching the per-report error taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    /// The remote service could not be reached in time
    Transport,
    /// The service answered with a non-2xx status
    Http,
    /// The body was not a record sequence
    Parse,
    /// No outcome was produced for a requested report
    Internal,
}

/// Why a single report failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "status", rename_all = "snake_case")]
pub enum FailureKind {
    /// Request exceeded its timeout
    TransportTimeout,
    /// Connection refused, DNS failure or other offline scenario
    TransportConnect,
    /// Any other transport failure
    Transport,
    /// HTTP 400
    InvalidRequest,
    /// HTTP 401/403
    AuthFailed(u16),
    /// HTTP 429
    RateLimit,
    /// HTTP 5xx
    ServerError(u16),
    /// Other 4xx
    ClientError(u16),
    /// Non-2xx status outside the 4xx/5xx classes
    UnexpectedStatus(u16),
    /// 2xx with a body that is not a record sequence
    ParseFailure,
    /// The aggregator found no outcome for a requested key
    Missing,
    /// The fetch task panicked before producing an outcome
    TaskPanicked,
}

impl FailureKind {
    /// Classify a non-2xx HTTP status
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => Self::InvalidRequest,
            401 | 403 => Self::AuthFailed(status),
            429 => Self::RateLimit,
            500..=599 => Self::ServerError(status),
            402..=499 => Self::ClientError(status),
            _ => Self::UnexpectedStatus(status),
        }
    }

    /// Classify a transport error
    pub fn from_transport(err: &TransportError) -> Self {
        match err {
            TransportError::Timeout(_) => Self::TransportTimeout,
            TransportError::Connect(_) => Self::TransportConnect,
            TransportError::Request(_) => Self::Transport,
        }
    }

    /// Failure family
    pub fn category(&self) -> FailureCategory {
        match self {
            Self::TransportTimeout | Self::TransportConnect | Self::Transport => {
                FailureCategory::Transport
            }
            Self::InvalidRequest
            | Self::AuthFailed(_)
            | Self::RateLimit
            | Self::ServerError(_)
            | Self::ClientError(_)
            | Self::UnexpectedStatus(_) => FailureCategory::Http,
            Self::ParseFailure => FailureCategory::Parse,
            Self::Missing | Self::TaskPanicked => FailureCategory::Internal,
        }
    }

    /// HTTP status behind this failure, if any
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::InvalidRequest => Some(400),
            Self::RateLimit => Some(429),
            Self::AuthFailed(code)
            | Self::ServerError(code)
            | Self::ClientError(code)
            | Self::UnexpectedStatus(code) => Some(*code),
            _ => None,
        }
    }

    /// Short user-facing description
    pub fn description(&self) -> &'static str {
        match self {
            Self::TransportTimeout => "network timeout",
            Self::TransportConnect => "connection failed",
            Self::Transport => "network error",
            Self::InvalidRequest => "invalid request",
            Self::AuthFailed(code) => match code {
                401 => "invalid API key",
                403 => "access denied",
                _ => "authentication failed",
            },
            Self::RateLimit => "rate limit exceeded",
            Self::ServerError(code) => match code {
                500 => "internal server error",
                502 => "bad gateway",
                503 => "service unavailable",
                504 => "gateway timeout",
                _ => "server error",
            },
            Self::ClientError(code) => match code {
                404 => "resource not found",
                _ => "client error",
            },
            Self::UnexpectedStatus(_) => "unexpected status",
            Self::ParseFailure => "unexpected response format",
            Self::Missing => "no result recorded",
            Self::TaskPanicked => "internal error",
        }
    }

    /// Suggested remediation
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::TransportTimeout => "Check your network connection or raise --timeout-secs",
            Self::TransportConnect => "Verify internet connectivity, DNS resolution and WB_API_URL",
            Self::Transport => "Check network connectivity and try again",
            Self::InvalidRequest => "Check the date range; some reports accept at most 31 days",
            Self::AuthFailed(_) => "Verify WB_API_KEY and the token's access scopes",
            Self::RateLimit => {
                "Lower --max-concurrency or raise --request-delay-ms and wait a minute"
            }
            Self::ServerError(_) => "The API may be experiencing issues, try again later",
            Self::ClientError(_) => "Review the report key and request parameters",
            Self::UnexpectedStatus(_) => "Inspect the response body for details",
            Self::ParseFailure => "The endpoint may have changed its response format",
            Self::Missing => "Re-run the load for this report",
            Self::TaskPanicked => "Re-run the load; report the failure if it repeats",
        }
    }

    /// Whether a retry could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TransportTimeout
                | Self::TransportConnect
                | Self::Transport
                | Self::RateLimit
                | Self::ServerError(_)
        )
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}
