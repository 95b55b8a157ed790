use std::fmt;
use std::str::FromStr;

use url::Url;

/// The last-known state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Running,
    Completed,
    Failed,
    Unknown,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Running => write!(f, "RUNNING"),
            JobState::Completed => write!(f, "COMPLETED"),
            JobState::Failed => write!(f, "FAILED"),
            JobState::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl FromStr for JobState {
    type Err = ();

    /// Only the exact uppercase names used in the cache file are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RUNNING" => Ok(JobState::Running),
            "COMPLETED" => Ok(JobState::Completed),
            "FAILED" => Ok(JobState::Failed),
            "UNKNOWN" => Ok(JobState::Unknown),
            _ => Err(()),
        }
    }
}

/// One tracked job: where it runs, its id on that host, and its last-known
/// state. `(location, job_id)` is the identity; a cache holds at most one
/// entry per key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostJobState {
    pub location: Url,
    pub job_id: i64,
    pub state: JobState,
}

impl HostJobState {
    pub fn new(location: Url, job_id: i64, state: JobState) -> Self {
        Self {
            location,
            job_id,
            state,
        }
    }

    /// Whether two entries refer to the same job, regardless of state.
    pub fn same_key(&self, other: &HostJobState) -> bool {
        self.location == other.location && self.job_id == other.job_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_names_round_trip() {
        for state in [
            JobState::Running,
            JobState::Completed,
            JobState::Failed,
            JobState::Unknown,
        ] {
            assert_eq!(state.to_string().parse::<JobState>(), Ok(state));
        }
    }

    #[test]
    fn state_names_are_exact() {
        assert!("running".parse::<JobState>().is_err());
        assert!("Completed".parse::<JobState>().is_err());
        assert!("".parse::<JobState>().is_err());
    }

    #[test]
    fn same_key_ignores_state() {
        let location = Url::parse("http://localhost:4503").unwrap();
        let a = HostJobState::new(location.clone(), 7, JobState::Running);
        let b = HostJobState::new(location.clone(), 7, JobState::Completed);
        let c = HostJobState::new(location, 8, JobState::Running);
        assert!(a.same_key(&b));
        assert!(!a.same_key(&c));
    }
}
