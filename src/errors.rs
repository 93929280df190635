use std::path::PathBuf;

use thiserror::Error;

/// Fatal failures. Any of these stops the run before a remote call is made
/// and maps to a non-zero exit status.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to read config file at {}: {source}", path.display())]
    ConfigLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No {0} found in configuration")]
    MissingCredential(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    InvalidSetting { key: &'static str, reason: String },

    #[error("Invalid base endpoint '{url}': {source}")]
    InvalidEndpoint {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Service key cannot be used as a header value: {0}")]
    InvalidCredential(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Invalid input: {0}")]
    Usage(String),

    #[error("Failed to write report: {0}")]
    Output(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
