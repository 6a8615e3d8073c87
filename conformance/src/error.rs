use std::fmt;

use config::ConfigError;
use ocimodel::ReferenceError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("do request: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("parse url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("path {0:?} does not start with /v2/")]
    InvalidPath(String),

    #[error("invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid reference: {0}")]
    InvalidReference(#[from] ReferenceError),

    #[error("{method} {url}: unexpected status code: {got}; want {want:?}")]
    UnexpectedStatus {
        method: String,
        url: String,
        got: u16,
        want: Vec<u16>,
        body: String,
    },

    #[error("unmarshal error response: {0}")]
    ErrorEnvelope(#[source] serde_json::Error),

    #[error("expected error response {want:?}, but got no errors")]
    NoErrors { want: String },

    #[error("unexpected number of errors: got {got}; want 1")]
    TooManyErrors { got: usize },

    #[error("unexpected error code: got {got:?}; want {want:?}")]
    ErrorCodeMismatch { got: String, want: String },

    #[error("unmarshal: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("marshal: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("{what} mismatch: want {want}, got {got}")]
    Mismatch {
        what: String,
        want: String,
        got: String,
    },

    #[error("load configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("{scenario}: {} case(s) failed:\n{}", .failures.len(), CaseList(.failures))]
    Failed {
        scenario: String,
        failures: Vec<CaseFailure>,
    },
}

impl HarnessError {
    pub fn mismatch(what: impl Into<String>, want: impl fmt::Debug, got: impl fmt::Debug) -> Self {
        HarnessError::Mismatch {
            what: what.into(),
            want: format!("{want:?}"),
            got: format!("{got:?}"),
        }
    }
}

/// One failed sub-case of a scenario
#[derive(Debug)]
pub struct CaseFailure {
    pub desc: String,
    pub error: HarnessError,
}

struct CaseList<'a>(&'a [CaseFailure]);

impl fmt::Display for CaseList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for failure in self.0 {
            writeln!(f, "  {}: {}", failure.desc, failure.error)?;
        }
        Ok(())
    }
}

pub type Result<T> = std::result::Result<T, HarnessError>;
