use std::fmt;

use thiserror::Error;

use crate::usage::UsageEnvelope;

/// What went wrong during a structured extraction call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionErrorKind {
    /// Transport failure, rate limiting or a 5xx from the service
    Network,
    /// Rejected credentials
    Auth,
    /// No response within the configured bound
    Timeout,
    /// The reply never conformed to the output schema
    SchemaValidation,
    /// Usage metadata was present but unusable
    MalformedUsage,
    Unknown,
}

impl fmt::Display for ExtractionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExtractionErrorKind::Network => "network",
            ExtractionErrorKind::Auth => "auth",
            ExtractionErrorKind::Timeout => "timeout",
            ExtractionErrorKind::SchemaValidation => "schema validation",
            ExtractionErrorKind::MalformedUsage => "malformed usage",
            ExtractionErrorKind::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("extraction failed ({kind}): {message}")]
pub struct ExtractionError {
    pub kind: ExtractionErrorKind,
    pub message: String,
    /// Tokens the service billed before failing
    pub usage: Option<UsageEnvelope>,
}

impl ExtractionError {
    pub fn new(kind: ExtractionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            usage: None,
        }
    }

    pub fn with_usage(mut self, usage: Option<UsageEnvelope>) -> Self {
        self.usage = usage;
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ExtractionErrorKind::Network, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ExtractionErrorKind::Auth, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ExtractionErrorKind::Timeout, message)
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self::new(ExtractionErrorKind::SchemaValidation, message)
    }

    pub fn malformed_usage(message: impl Into<String>) -> Self {
        Self::new(ExtractionErrorKind::MalformedUsage, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ExtractionErrorKind::Unknown, message)
    }
}

/// Failure while persisting a session's cost report.
#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}
