use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use url::Url;

use crate::environment::Environment;
use crate::error::{GrabbitError, Result};
use crate::monitor::status::JobStatus;

/// The strategy used to get the current status of a job.
#[async_trait]
pub trait JobStatusPoller: Send + Sync {
    async fn poll_job_status(&self, location: &Url, job_id: i64) -> Result<JobStatus>;
}

/// A [`JobStatusPoller`] that asks the remote host for job information.
pub struct RemoteJobStatusPoller {
    environment: Environment,
    client: Client,
}

impl RemoteJobStatusPoller {
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl JobStatusPoller for RemoteJobStatusPoller {
    async fn poll_job_status(&self, location: &Url, job_id: i64) -> Result<JobStatus> {
        let url = location.join(&format!("/grabbit/job/{job_id}.json"))?;
        let credentials = self
            .environment
            .credentials_for(location)
            .ok_or_else(|| GrabbitError::CredentialLookup(location.clone()))?;

        let connection_err = |source| GrabbitError::Connection {
            url: url.to_string(),
            source,
        };

        let response = self
            .client
            .get(url.clone())
            .header(
                AUTHORIZATION,
                format!("Basic {}", credentials.basic_auth_encode()),
            )
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(connection_err)?;

        let body = response.text().await.map_err(connection_err)?;
        JobStatus::from_json(location.clone(), &body)
    }
}
