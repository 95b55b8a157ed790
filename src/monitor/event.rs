use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use url::Url;

use crate::monitor::status::JobStatus;

/// A discrete, ordered notification describing monitoring-loop progress.
#[derive(Debug, Clone)]
pub enum MonitoringEvent {
    /// The monitoring run began. Emitted exactly once, before the first sweep.
    Start,
    /// A job is about to be polled.
    Polling { location: Url, job_id: i64 },
    /// The jobs seen COMPLETED in the sweep that just finished (possibly none).
    CompletedJobs(Vec<JobStatus>),
    /// The jobs seen FAILED in the sweep that just finished (possibly none).
    FailedJobs(Vec<JobStatus>),
    /// Jobs are still running; the monitor pauses for this long before the
    /// next sweep.
    Sleep(Duration),
    /// No job remains running. Always the last event of a completed run.
    End {
        started: DateTime<Utc>,
        finished: DateTime<Utc>,
    },
}

impl fmt::Display for MonitoringEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitoringEvent::Start => write!(f, "Starting to monitor jobs"),
            MonitoringEvent::Polling { location, job_id } => {
                write!(f, "Polling Grabbit job {job_id} on {location}")
            }
            MonitoringEvent::CompletedJobs(jobs) => {
                writeln!(f, "\n====================== COMPLETED =====================")?;
                for job in jobs {
                    writeln!(f, "{job}")?;
                }
                Ok(())
            }
            MonitoringEvent::FailedJobs(jobs) => {
                writeln!(f, "\n======================= FAILED =======================")?;
                for job in jobs {
                    writeln!(f, "{job}")?;
                }
                Ok(())
            }
            MonitoringEvent::Sleep(duration) => {
                write!(
                    f,
                    "\n====================== Sleeping for {} ms =======================",
                    duration.as_millis()
                )
            }
            MonitoringEvent::End { started, finished } => {
                write!(
                    f,
                    "\n======================== DONE ========================\n\
                     started: {started}\nfinished: {finished}"
                )
            }
        }
    }
}
