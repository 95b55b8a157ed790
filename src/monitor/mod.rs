pub mod cache;
pub mod event;
pub mod poller;
pub mod polling;
pub mod state;
pub mod status;

pub use cache::{FileJobStatusCache, JobStatusCache, MemoryJobStatusCache};
pub use event::MonitoringEvent;
pub use poller::{JobStatusPoller, RemoteJobStatusPoller};
pub use polling::{MonitorHandle, PollingJobMonitor, DEFAULT_POLL_INTERVAL};
pub use state::{HostJobState, JobState};
pub use status::JobStatus;
