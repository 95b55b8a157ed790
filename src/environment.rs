use std::collections::BTreeMap;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;
use url::Url;

use crate::error::{GrabbitError, Result};

/// The role a host plays in the content-replication environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Author,
    Publisher,
}

impl NodeType {
    /// Maps a `clientNodeType` configuration value to a [`NodeType`].
    pub fn from_config_name(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "author" => Ok(NodeType::Author),
            "publish" | "publisher" => Ok(NodeType::Publisher),
            other => Err(GrabbitError::Config(format!(
                "Could not map \"{other}\" to a node type"
            ))),
        }
    }
}

/// HTTP Basic credentials for a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The `base64(username:password)` payload of a Basic Authorization header.
    pub fn basic_auth_encode(&self) -> String {
        STANDARD.encode(format!("{}:{}", self.username, self.password))
    }
}

/// Role, base address and credentials for one remote instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    pub node_type: NodeType,
    pub base_uri: Url,
    pub credentials: Credentials,
}

impl HostInfo {
    pub fn new(node_type: NodeType, base_uri: Url, credentials: Credentials) -> Self {
        Self {
            node_type,
            base_uri,
            credentials,
        }
    }
}

/// The set of known hosts for one named environment.
#[derive(Debug, Clone)]
pub struct Environment {
    hosts: Vec<HostInfo>,
}

impl Environment {
    pub fn new(hosts: Vec<HostInfo>) -> Self {
        Self { hosts }
    }

    /// Loads the named environment from a YAML configuration file.
    ///
    /// The file maps environment names to host descriptions:
    ///
    /// ```yaml
    /// prod:
    ///   username: admin
    ///   password: secret
    ///   protocol: http
    ///   domainName: example.com
    ///   authors:
    ///     author01: 4502
    ///   publishers:
    ///     pub01: 4503
    /// ```
    pub fn from_config_file(path: &Path, environment_name: &str) -> Result<Self> {
        if !path.exists() {
            return Err(GrabbitError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content, environment_name).map_err(|e| match e {
            GrabbitError::Config(msg) => {
                GrabbitError::Config(format!("{msg} in \"{}\"", path.display()))
            }
            other => other,
        })
    }

    fn from_yaml(content: &str, environment_name: &str) -> Result<Self> {
        let environments: BTreeMap<String, serde_yaml::Value> = serde_yaml::from_str(content)?;
        let env = environments
            .get(environment_name)
            .ok_or_else(|| GrabbitError::Config(format!("Can not find \"{environment_name}\"")))?;
        let config: EnvironmentConfig = serde_yaml::from_value(env.clone())?;

        config.into_environment()
    }

    pub fn all_hosts(&self) -> &[HostInfo] {
        &self.hosts
    }

    /// The author hosts. Content is only ever pulled to a single author, so at
    /// most one host is returned even when more are configured.
    pub fn authors(&self) -> Vec<&HostInfo> {
        self.hosts
            .iter()
            .filter(|h| h.node_type == NodeType::Author)
            .take(1)
            .collect()
    }

    pub fn publishers(&self) -> Vec<&HostInfo> {
        self.hosts
            .iter()
            .filter(|h| h.node_type == NodeType::Publisher)
            .collect()
    }

    pub fn hosts_of_type(&self, node_type: NodeType) -> Vec<&HostInfo> {
        match node_type {
            NodeType::Author => self.authors(),
            NodeType::Publisher => self.publishers(),
        }
    }

    /// Looks up the credentials for a host by its base address.
    pub fn credentials_for(&self, base_uri: &Url) -> Option<&Credentials> {
        self.hosts
            .iter()
            .find(|h| h.base_uri == *base_uri)
            .map(|h| &h.credentials)
    }
}

#[derive(Debug, Deserialize)]
struct EnvironmentConfig {
    username: String,
    password: String,
    protocol: String,
    #[serde(rename = "domainName", default)]
    domain_name: Option<String>,
    #[serde(default)]
    authors: BTreeMap<String, PortValue>,
    #[serde(default)]
    publishers: BTreeMap<String, PortValue>,
}

/// Ports appear as numbers or as quoted strings depending on who wrote the
/// config file.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PortValue {
    Number(u16),
    Text(String),
}

impl PortValue {
    fn port(&self) -> Result<u16> {
        match self {
            PortValue::Number(port) => Ok(*port),
            PortValue::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| GrabbitError::Config(format!("Invalid port \"{text}\""))),
        }
    }
}

impl EnvironmentConfig {
    fn into_environment(self) -> Result<Environment> {
        let credentials = Credentials::new(self.username, self.password);
        let domain = self
            .domain_name
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());

        let mut hosts = Vec::new();
        for (hostname, port) in &self.authors {
            hosts.push(HostInfo::new(
                NodeType::Author,
                base_uri(&self.protocol, domain, hostname, port.port()?)?,
                credentials.clone(),
            ));
        }
        for (hostname, port) in &self.publishers {
            hosts.push(HostInfo::new(
                NodeType::Publisher,
                base_uri(&self.protocol, domain, hostname, port.port()?)?,
                credentials.clone(),
            ));
        }

        Ok(Environment::new(hosts))
    }
}

fn base_uri(protocol: &str, domain: Option<&str>, hostname: &str, port: u16) -> Result<Url> {
    let host = match domain {
        Some(domain) => format!("{hostname}.{domain}"),
        None => hostname.to_string(),
    };
    Ok(Url::parse(&format!("{protocol}://{host}:{port}"))?)
}
