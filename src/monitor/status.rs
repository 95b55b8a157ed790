use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};
use serde_json::Value;
use url::Url;

use crate::error::{GrabbitError, Result};
use crate::monitor::state::JobState;

/// Timestamp format used by the job status endpoint, e.g.
/// `2016-03-01T14:13:05-0500`.
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// An immutable snapshot of a job's status, as returned by a host's REST API.
#[derive(Debug, Clone, PartialEq)]
pub struct JobStatus {
    pub uri: Url,
    pub transaction_id: i64,
    pub job_execution_id: i64,
    pub start_time: DateTime<FixedOffset>,
    pub end_time: Option<DateTime<FixedOffset>>,
    pub path: String,
    pub time_taken: i64,
    pub jcr_nodes_written: i64,
    pub exit_description: String,
    pub exit_code: String,
    pub running: bool,
}

impl JobStatus {
    /// Parses a status response body.
    ///
    /// Fields the host did not report get placeholder defaults (`-1` ids and
    /// counts, a sentinel path, "now" for the start time) so a partial body
    /// still yields a usable snapshot. A body that is not a JSON object, or a
    /// timestamp in an unexpected format, is a parse error.
    pub fn from_json(uri: Url, body: &str) -> Result<Self> {
        let body = body.trim();
        let json: Value = if body.is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(body)
                .map_err(|e| GrabbitError::StatusParse(format!("{e} in {body:?}")))?
        };
        if !json.is_object() {
            return Err(GrabbitError::StatusParse(format!(
                "expected an object, got {body:?}"
            )));
        }

        let start_time = match json.get("startTime").and_then(Value::as_str) {
            Some(text) => parse_date_time(text)?,
            None => Utc::now().fixed_offset(),
        };
        let end_time = match json.get("endTime").and_then(Value::as_str) {
            Some(text) => Some(parse_date_time(text)?),
            None => None,
        };

        let exit_status = json.get("exitStatus").cloned().unwrap_or_default();

        Ok(JobStatus {
            uri,
            transaction_id: int_field(&json, "transactionID"),
            job_execution_id: int_field(&json, "jobExecutionId"),
            start_time,
            end_time,
            path: str_field(&json, "path", "/MISSING_PATH"),
            time_taken: int_field(&json, "timeTaken"),
            jcr_nodes_written: int_field(&json, "jcrNodesWritten"),
            exit_description: str_field(&exit_status, "exitDescription", ""),
            exit_code: str_field(&exit_status, "exitCode", "UNKNOWN"),
            running: exit_status
                .get("running")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        })
    }

    /// The job state this snapshot implies. A job that reports itself running
    /// is RUNNING no matter what its exit code says; otherwise the exit code
    /// decides, compared case-insensitively.
    pub fn state(&self) -> JobState {
        if self.running {
            return JobState::Running;
        }
        if self.exit_code.eq_ignore_ascii_case("COMPLETED") {
            return JobState::Completed;
        }
        if self.exit_code.eq_ignore_ascii_case("FAILED") {
            return JobState::Failed;
        }
        JobState::Unknown
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "job: {}", self.job_execution_id)?;
        writeln!(f, "startTime: {}", self.start_time.format(DATE_TIME_FORMAT))?;
        writeln!(f, "path: {}", self.path)?;
        writeln!(f, "status: {}", self.exit_code)?;
        writeln!(f, "running: {}", self.running)?;
        writeln!(f, "timeTaken: {}", self.time_taken)?;
        writeln!(f, "jcrNodesWritten: {}", self.jcr_nodes_written)?;
        write!(f, "---")
    }
}

fn parse_date_time(text: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_str(text, DATE_TIME_FORMAT)
        .map_err(|e| GrabbitError::StatusParse(format!("bad timestamp {text:?}: {e}")))
}

/// Numeric fields sometimes arrive as strings; both forms are accepted.
fn int_field(json: &Value, key: &str) -> i64 {
    json.get(key)
        .and_then(|v| {
            v.as_i64()
                .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
        })
        .unwrap_or(-1)
}

fn str_field(json: &Value, key: &str, default: &str) -> String {
    json.get(key)
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_string()
}
