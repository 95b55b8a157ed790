use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use url::Url;

use crate::environment::{HostInfo, NodeType};
use crate::error::{GrabbitError, Result};

/// The shape of a successful job-creation response, e.g. `"[123, 456]"`.
static JOB_IDS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\[([\d,\s]*)\]\s*$").expect("job ids pattern is valid")
});

/// The job configuration sent to each host when creating jobs.
///
/// The raw file content is the request payload; the top-level
/// `clientNodeType` key selects which hosts the jobs are started on.
#[derive(Debug, Clone)]
pub struct JobsConfig {
    path: PathBuf,
    content: String,
}

impl JobsConfig {
    /// Grabbit's job endpoint takes the configuration as JSON.
    pub const CONTENT_TYPE: &'static str = "application/json";

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(GrabbitError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            content,
        })
    }

    /// The node type the jobs run against, from the `clientNodeType` key.
    pub fn node_type(&self) -> Result<NodeType> {
        let config: serde_yaml::Value = serde_yaml::from_str(&self.content)?;
        let node_type = config
            .get("clientNodeType")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                GrabbitError::Config(format!(
                    "Could not find key \"clientNodeType\" at the top level of \"{}\"",
                    self.path.display()
                ))
            })?;
        NodeType::from_config_name(node_type)
    }

    /// The raw configuration text, sent verbatim as the request body.
    pub fn payload(&self) -> &str {
        &self.content
    }
}

/// The outcome of starting jobs on one host: either the created job ids, in
/// creation order, or that host's failure. One host failing never affects the
/// entries of its siblings.
#[derive(Debug)]
pub struct HostJobIds {
    pub base_uri: Url,
    pub job_ids: Result<Vec<i64>>,
}

/// Starts replication jobs on a set of hosts.
pub struct JobStarter {
    jobs_config: JobsConfig,
    hosts: Vec<HostInfo>,
    client: Client,
}

impl JobStarter {
    pub fn new(jobs_config: JobsConfig, hosts: Vec<HostInfo>) -> Self {
        Self {
            jobs_config,
            hosts,
            client: Client::new(),
        }
    }

    /// Starts the configured jobs on every host, one request at a time,
    /// returning the hosts and their job ids.
    pub async fn start_jobs(&self) -> Vec<HostJobIds> {
        let mut started = Vec::with_capacity(self.hosts.len());
        for host in &self.hosts {
            tracing::info!(host = %host.base_uri, "Starting jobs");
            let job_ids = self.start_jobs_on_host(host).await;
            if let Err(e) = &job_ids {
                tracing::warn!(host = %host.base_uri, error = %e, "Could not start jobs");
            }
            started.push(HostJobIds {
                base_uri: host.base_uri.clone(),
                job_ids,
            });
        }
        started
    }

    async fn start_jobs_on_host(&self, host: &HostInfo) -> Result<Vec<i64>> {
        let url = host.base_uri.join("/grabbit/job")?;
        let connection_err = |source| GrabbitError::Connection {
            url: url.to_string(),
            source,
        };

        let response = self
            .client
            .put(url.clone())
            .header(CONTENT_TYPE, JobsConfig::CONTENT_TYPE)
            .header(
                AUTHORIZATION,
                format!("Basic {}", host.credentials.basic_auth_encode()),
            )
            .body(self.jobs_config.payload().to_string())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(connection_err)?;

        let output = response.text().await.map_err(connection_err)?;
        parse_job_ids(output.trim())
    }
}

/// Parses a job-creation response into job ids.
///
/// The whole text must look like `[123, 456]`; anything else fails with the
/// raw text preserved for diagnosis. An empty list (`"[]"`) is valid.
pub fn parse_job_ids(output: &str) -> Result<Vec<i64>> {
    let captures = JOB_IDS_PATTERN
        .captures(output)
        .ok_or_else(|| GrabbitError::JobIdParse(output.to_string()))?;

    let mut job_ids = Vec::new();
    for part in captures[1].split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let job_id = part
            .parse()
            .map_err(|_| GrabbitError::JobIdParse(output.to_string()))?;
        job_ids.push(job_id);
    }
    Ok(job_ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn jobs_config(content: &str) -> JobsConfig {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        JobsConfig::open(file.path()).unwrap()
    }

    #[test]
    fn node_type_from_client_node_type_key() {
        let config = jobs_config("clientNodeType: publish\npathConfigurations:\n  - path: /content\n");
        assert_eq!(config.node_type().unwrap(), NodeType::Publisher);

        let config = jobs_config("clientNodeType: Author\n");
        assert_eq!(config.node_type().unwrap(), NodeType::Author);
    }

    #[test]
    fn missing_client_node_type_fails() {
        let config = jobs_config("pathConfigurations:\n  - path: /content\n");
        assert!(matches!(
            config.node_type().unwrap_err(),
            GrabbitError::Config(_)
        ));
    }

    #[test]
    fn payload_is_raw_file_content() {
        let config = jobs_config("clientNodeType: publish\n");
        assert_eq!(config.payload(), "clientNodeType: publish\n");
    }

    #[test]
    fn open_missing_file_fails() {
        assert!(matches!(
            JobsConfig::open("/no/such/jobs.yaml").unwrap_err(),
            GrabbitError::FileNotFound(_)
        ));
    }
}
