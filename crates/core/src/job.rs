//! Generation job wire types, lifecycle states, and poll reconciliation.
//!
//! The controller in `prodgen-studio` owns the timer and the network
//! calls; everything that decides *what happens next* lives here as pure
//! functions so the transition rules can be tested without a runtime.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Fixed period between job status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

// ---------------------------------------------------------------------------
// Job id
// ---------------------------------------------------------------------------

/// Opaque job identifier.
///
/// The backend emits integer ids while the contract describes a string,
/// so both JSON forms are accepted and normalised to text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawJobId", into = "String")]
pub struct JobId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawJobId {
    Text(String),
    Number(i64),
}

impl TryFrom<RawJobId> for JobId {
    type Error = String;

    fn try_from(raw: RawJobId) -> Result<Self, Self::Error> {
        match raw {
            RawJobId::Text(s) if s.trim().is_empty() => Err("job id must not be empty".into()),
            RawJobId::Text(s) => Ok(JobId(s)),
            RawJobId::Number(n) => Ok(JobId(n.to_string())),
        }
    }
}

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<JobId> for String {
    fn from(id: JobId) -> Self {
        id.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Wire payloads
// ---------------------------------------------------------------------------

/// Backend-reported job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Accepted but not yet picked up by a worker.
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Response of `POST /products/{id}/generate_images/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartJobResponse {
    pub job_id: JobId,
    #[serde(default)]
    pub status: Option<JobStatus>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub generated_count: u32,
}

/// Response of `GET /products/{id}/job_status/?job_id=...`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusReport {
    #[serde(alias = "id")]
    pub job_id: JobId,
    pub status: JobStatus,
    #[serde(default)]
    pub result: Option<GenerationResult>,
    #[serde(default)]
    pub error_message: Option<String>,
}

// ---------------------------------------------------------------------------
// Lifecycle state
// ---------------------------------------------------------------------------

/// Client-side lifecycle of the generation job tracked by one product view.
///
/// `Idle -> Starting -> Polling -> Completed | Failed`, and any terminal
/// state may re-enter `Starting` on a new user request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum JobState {
    #[default]
    Idle,
    /// A start request is in flight; no job id yet.
    Starting,
    Polling {
        job_id: JobId,
    },
    Completed {
        job_id: JobId,
        generated_count: Option<u32>,
    },
    Failed {
        job_id: JobId,
        /// Backend error text, surfaced verbatim.
        error_message: Option<String>,
    },
}

impl JobState {
    /// True while a job is Starting or Polling; the generate control is
    /// disabled exactly when this holds.
    pub fn is_active(&self) -> bool {
        matches!(self, JobState::Starting | JobState::Polling { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed { .. } | JobState::Failed { .. })
    }

    /// Job whose poll responses are currently accepted.
    pub fn polling_job_id(&self) -> Option<&JobId> {
        match self {
            JobState::Polling { job_id } => Some(job_id),
            _ => None,
        }
    }

    /// Job id associated with this state, if any.
    pub fn job_id(&self) -> Option<&JobId> {
        match self {
            JobState::Idle | JobState::Starting => None,
            JobState::Polling { job_id }
            | JobState::Completed { job_id, .. }
            | JobState::Failed { job_id, .. } => Some(job_id),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            JobState::Idle => "idle",
            JobState::Starting => "starting",
            JobState::Polling { .. } => "polling",
            JobState::Completed { .. } => "completed",
            JobState::Failed { .. } => "failed",
        }
    }
}

// ---------------------------------------------------------------------------
// Poll reconciliation
// ---------------------------------------------------------------------------

/// What the controller should do with one poll result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollDecision {
    /// Job still running: stay in Polling and schedule the next poll.
    Continue,
    /// Job finished: stop polling, refetch the product.
    Complete { generated_count: Option<u32> },
    /// Job failed on the backend: stop polling, no refetch.
    Fail { error_message: Option<String> },
    /// Transport or decode failure, or a response that names another job:
    /// keep state, schedule the next poll.
    Retry,
    /// Result belongs to a job that is no longer current.
    Discard,
}

/// Decide the transition for a poll issued against `requested`.
///
/// `current` is the job the controller is polling right now (`None` when
/// not polling). `report` is `None` when the request failed in transport
/// or decoding. A result is applied only when both the requested job id
/// and the id embedded in the response match the current job. A response
/// for the current request that echoes some other id is unusable, so it
/// is retried like a transport failure.
pub fn reconcile_poll(
    current: Option<&JobId>,
    requested: &JobId,
    report: Option<&JobStatusReport>,
) -> PollDecision {
    if current != Some(requested) {
        return PollDecision::Discard;
    }
    let Some(report) = report else {
        return PollDecision::Retry;
    };
    if &report.job_id != requested {
        return PollDecision::Retry;
    }
    match report.status {
        JobStatus::Pending | JobStatus::Processing => PollDecision::Continue,
        JobStatus::Completed => PollDecision::Complete {
            generated_count: report.result.map(|r| r.generated_count),
        },
        JobStatus::Failed => PollDecision::Fail {
            error_message: report.error_message.clone(),
        },
    }
}

/// Message used when an opt-in failure cap ends polling.
pub fn poll_gave_up_message(failures: u32) -> String {
    format!("Lost contact with the generation job after {failures} failed status checks")
}
