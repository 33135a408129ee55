//! Pipeline failure kinds and the status each one answers with.

use std::io;

use thiserror::Error;

use crate::filter::{FilterError, MatchedRule};
use crate::http::request::RequestError;
use crate::http::response::ErrorStatus;

/// Why a connection stopped before its response was relayed.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to read request head: {0}")]
    Read(#[source] io::Error),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("host {host} blocked by {rule}")]
    Blocked { host: String, rule: MatchedRule },

    #[error("failed to forward request to destination: {0}")]
    Forward(#[source] io::Error),

    #[error("failed to relay response to client: {0}")]
    Relay(#[source] io::Error),
}

impl PipelineError {
    /// Status sent back to the client.
    pub fn status(&self) -> ErrorStatus {
        match self {
            PipelineError::Read(_) | PipelineError::Forward(_) | PipelineError::Relay(_) => {
                ErrorStatus::InternalServerError
            }
            PipelineError::Request(e) => e.status(),
            PipelineError::Filter(_) => ErrorStatus::NotFound,
            PipelineError::Blocked { .. } => ErrorStatus::Forbidden,
        }
    }

    /// Failures caused by the client or the policy rather than the proxy.
    pub fn is_rejection(&self) -> bool {
        self.status() != ErrorStatus::InternalServerError
    }
}
