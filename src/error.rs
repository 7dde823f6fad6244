//! # Error Module
//!
//! The error taxonomy of the research workflow, one thiserror enum per layer:
//!
//! - search layer: [`ProviderError`] (one backend) and [`SearchError`] (the adapter)
//! - text-analysis layer: [`AnalysisError`]
//! - model capability: [`ModelError`]
//! - agent layer: [`AgentError`]
//!
//! Engine-layer failures never surface as Rust errors. They are recorded in
//! the result envelope as an [`ErrorDescriptor`], which is also the shape
//! every other layer is flattened into when it ends a run.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::state::ProviderKind;

// =============================================================================
// ERROR KINDS
// =============================================================================
/// Flat, serializable list of every failure kind the workflow can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    // search layer
    ProviderUnavailable,
    RateLimited,
    InvalidResponse,
    AllProvidersExhausted,
    // text-analysis layer
    EmptyInput,
    // agent layer
    ToolFailure,
    ModelFailure,
    // engine layer
    IterationLimitExceeded,
    TimeoutExceeded,
    ValidationLoopExceeded,
    /// Blank query or unknown depth at the entry point
    InvalidRequest,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ProviderUnavailable => "ProviderUnavailable",
            ErrorKind::RateLimited => "RateLimited",
            ErrorKind::InvalidResponse => "InvalidResponse",
            ErrorKind::AllProvidersExhausted => "AllProvidersExhausted",
            ErrorKind::EmptyInput => "EmptyInput",
            ErrorKind::ToolFailure => "ToolFailure",
            ErrorKind::ModelFailure => "ModelFailure",
            ErrorKind::IterationLimitExceeded => "IterationLimitExceeded",
            ErrorKind::TimeoutExceeded => "TimeoutExceeded",
            ErrorKind::ValidationLoopExceeded => "ValidationLoopExceeded",
            ErrorKind::InvalidRequest => "InvalidRequest",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind plus human-readable cause, as carried in `ResearchState::error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorDescriptor {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

// =============================================================================
// SEARCH LAYER
// =============================================================================
/// Failure of a single search backend.
///
/// Every variant makes the adapter move on to the next provider; none of
/// them is retried against the same provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("{provider} unavailable: {message}")]
    ProviderUnavailable {
        provider: ProviderKind,
        message: String,
    },

    #[error("Rate limited by {provider}, please wait")]
    RateLimited { provider: ProviderKind },

    #[error("Invalid response from {provider}: {message}")]
    InvalidResponse {
        provider: ProviderKind,
        message: String,
    },
}

impl ProviderError {
    pub fn unavailable(provider: ProviderKind, message: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            provider,
            message: message.into(),
        }
    }

    pub fn invalid_response(provider: ProviderKind, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider,
            message: message.into(),
        }
    }

    /// Map a transport-level reqwest failure onto the taxonomy.
    pub fn from_transport(provider: ProviderKind, err: &reqwest::Error) -> Self {
        if err.is_decode() {
            Self::invalid_response(provider, err.to_string())
        } else {
            Self::unavailable(provider, err.to_string())
        }
    }

    pub fn provider(&self) -> ProviderKind {
        match self {
            ProviderError::ProviderUnavailable { provider, .. }
            | ProviderError::RateLimited { provider }
            | ProviderError::InvalidResponse { provider, .. } => *provider,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ProviderError::ProviderUnavailable { .. } => ErrorKind::ProviderUnavailable,
            ProviderError::RateLimited { .. } => ErrorKind::RateLimited,
            ProviderError::InvalidResponse { .. } => ErrorKind::InvalidResponse,
        }
    }
}

/// Failure of the search adapter as a whole.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// Every configured provider failed (or none is configured)
    #[error("All search providers exhausted: {}", describe_attempts(.attempts))]
    AllProvidersExhausted { attempts: Vec<ProviderError> },
}

fn describe_attempts(attempts: &[ProviderError]) -> String {
    if attempts.is_empty() {
        return "no providers configured".to_string();
    }
    attempts
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<&SearchError> for ErrorDescriptor {
    fn from(err: &SearchError) -> Self {
        ErrorDescriptor::new(ErrorKind::AllProvidersExhausted, err.to_string())
    }
}

// =============================================================================
// TEXT-ANALYSIS LAYER
// =============================================================================
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    /// Recoverable: the caller should skip the operation
    #[error("Input text is empty")]
    EmptyInput,
}

impl From<&AnalysisError> for ErrorDescriptor {
    fn from(err: &AnalysisError) -> Self {
        ErrorDescriptor::new(ErrorKind::EmptyInput, err.to_string())
    }
}

// =============================================================================
// MODEL CAPABILITY
// =============================================================================
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Language model unreachable: {0}")]
    Unreachable(String),

    #[error("Language model request failed: {0}")]
    Request(String),
}

// =============================================================================
// AGENT LAYER
// =============================================================================
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    /// For agents whose tool failure must end the run. The built-in search
    /// agent absorbs its failures into a note instead.
    #[error("Tool failure: {0}")]
    ToolFailure(String),

    #[error("Model failure: {0}")]
    ModelFailure(#[from] ModelError),
}

impl From<&AgentError> for ErrorDescriptor {
    fn from(err: &AgentError) -> Self {
        let kind = match err {
            AgentError::ToolFailure(_) => ErrorKind::ToolFailure,
            AgentError::ModelFailure(_) => ErrorKind::ModelFailure,
        };
        ErrorDescriptor::new(kind, err.to_string())
    }
}
