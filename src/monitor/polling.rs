use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::environment::Environment;
use crate::error::{GrabbitError, Result};
use crate::monitor::cache::JobStatusCache;
use crate::monitor::event::MonitoringEvent;
use crate::monitor::poller::{JobStatusPoller, RemoteJobStatusPoller};
use crate::monitor::state::{HostJobState, JobState};
use crate::monitor::status::JobStatus;

/// Default period between status sweeps.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(15_000);

/// A job monitor that repeatedly polls hosts for the status of the jobs in
/// its cache until none remain running.
///
/// The cache is owned by the monitor and handed to the background task, so
/// only that task ever mutates it while a run is in flight. Job-start
/// failures are isolated per host by [`crate::starter::JobStarter`], but a
/// poll failure here aborts the entire run: a cache that can no longer be
/// refreshed truthfully is worth more as a loud error than as an endless
/// retry loop.
pub struct PollingJobMonitor<C> {
    cache: C,
    poller: Box<dyn JobStatusPoller>,
    poll_interval: Duration,
}

impl<C> PollingJobMonitor<C>
where
    C: JobStatusCache + Send + 'static,
{
    pub fn builder(cache: C) -> PollingJobMonitorBuilder<C> {
        PollingJobMonitorBuilder {
            cache,
            poller: None,
            environment: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Spawns the monitoring loop on a background task and returns a handle
    /// to its event stream.
    ///
    /// The stream carries one `Start`, then per sweep a `Polling` per running
    /// job followed by `CompletedJobs` and `FailedJobs`, a `Sleep` whenever
    /// another sweep is coming, and finally one `End` when nothing is left
    /// running.
    pub fn monitor(self) -> MonitorHandle {
        let (events, receiver) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_monitor(
            self.cache,
            self.poller,
            self.poll_interval,
            events,
        ));
        MonitorHandle {
            events: receiver,
            task,
        }
    }
}

/// Builds a [`PollingJobMonitor`], validating eagerly: a poller or an
/// environment (from which a [`RemoteJobStatusPoller`] is derived) must be
/// provided before [`build`](PollingJobMonitorBuilder::build) succeeds.
pub struct PollingJobMonitorBuilder<C> {
    cache: C,
    poller: Option<Box<dyn JobStatusPoller>>,
    environment: Option<Environment>,
    poll_interval: Duration,
}

impl<C> PollingJobMonitorBuilder<C>
where
    C: JobStatusCache + Send + 'static,
{
    /// The strategy to use for polling. Takes precedence over
    /// [`environment`](Self::environment).
    pub fn poller(mut self, poller: impl JobStatusPoller + 'static) -> Self {
        self.poller = Some(Box::new(poller));
        self
    }

    /// The environment used to derive a [`RemoteJobStatusPoller`].
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// How long to sleep between sweeps. Defaults to
    /// [`DEFAULT_POLL_INTERVAL`].
    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn build(self) -> Result<PollingJobMonitor<C>> {
        let poller = match (self.poller, self.environment) {
            (Some(poller), _) => poller,
            (None, Some(environment)) => Box::new(RemoteJobStatusPoller::new(environment)),
            (None, None) => {
                return Err(GrabbitError::Config(
                    "Need to provide either a status poller or an environment".to_string(),
                ))
            }
        };

        Ok(PollingJobMonitor {
            cache: self.cache,
            poller,
            poll_interval: self.poll_interval,
        })
    }
}

/// A running monitor: the event stream plus the background task's outcome.
pub struct MonitorHandle {
    events: mpsc::UnboundedReceiver<MonitoringEvent>,
    task: JoinHandle<Result<()>>,
}

impl MonitorHandle {
    /// The next monitoring event, or `None` once the stream has ended.
    pub async fn next_event(&mut self) -> Option<MonitoringEvent> {
        self.events.recv().await
    }

    /// Waits for the monitoring task to finish. A poll failure aborts the
    /// run and surfaces here.
    pub async fn wait(self) -> Result<()> {
        self.task
            .await
            .map_err(|e| GrabbitError::Task(e.to_string()))?
    }
}

async fn run_monitor<C: JobStatusCache>(
    mut cache: C,
    poller: Box<dyn JobStatusPoller>,
    poll_interval: Duration,
    events: mpsc::UnboundedSender<MonitoringEvent>,
) -> Result<()> {
    let started = Utc::now();
    let _ = events.send(MonitoringEvent::Start);

    loop {
        let polled = sweep(&mut cache, poller.as_ref(), &events).await?;

        let mut completed = Vec::new();
        let mut failed = Vec::new();
        let mut has_running = false;
        for status in polled {
            match status.state() {
                JobState::Completed => completed.push(status),
                JobState::Failed => failed.push(status),
                JobState::Running => has_running = true,
                JobState::Unknown => {}
            }
        }
        let _ = events.send(MonitoringEvent::CompletedJobs(completed));
        let _ = events.send(MonitoringEvent::FailedJobs(failed));

        if !has_running {
            break;
        }
        let _ = events.send(MonitoringEvent::Sleep(poll_interval));
        tokio::time::sleep(poll_interval).await;
    }

    let _ = events.send(MonitoringEvent::End {
        started,
        finished: Utc::now(),
    });
    Ok(())
}

/// One pass over the entries that were RUNNING when the sweep began. Entries
/// added while a sweep is in flight are picked up by the next one.
async fn sweep<C: JobStatusCache>(
    cache: &mut C,
    poller: &dyn JobStatusPoller,
    events: &mpsc::UnboundedSender<MonitoringEvent>,
) -> Result<Vec<JobStatus>> {
    let running: Vec<HostJobState> = cache
        .entries()
        .iter()
        .filter(|e| e.state == JobState::Running)
        .cloned()
        .collect();

    let mut polled = Vec::with_capacity(running.len());
    for entry in running {
        let _ = events.send(MonitoringEvent::Polling {
            location: entry.location.clone(),
            job_id: entry.job_id,
        });
        tracing::debug!(host = %entry.location, job_id = entry.job_id, "Polling job status");

        let status = poller.poll_job_status(&entry.location, entry.job_id).await?;
        cache.put_state(entry.location, status.job_execution_id, status.state())?;
        polled.push(status);
    }
    Ok(polled)
}
