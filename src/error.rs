use std::path::PathBuf;

use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum GrabbitError {
    #[error("\"{}\" could not be found", .0.display())]
    FileNotFound(PathBuf),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Could not parse configuration: {0}")]
    ConfigFormat(#[from] serde_yaml::Error),

    #[error("{source} when trying to connect to {url}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Could not parse job ids from: {0}")]
    JobIdParse(String),

    #[error("Could not parse job status: {0}")]
    StatusParse(String),

    #[error("Malformed line \"{line}\" in \"{}\"", .file.display())]
    CacheFormat { file: PathBuf, line: String },

    #[error("Could not find a credentials match for {0}")]
    CredentialLookup(Url),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Task error: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, GrabbitError>;
