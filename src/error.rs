use serde::{Serialize, Deserialize};
use serde_with::SerializeDisplay;
use std::fmt;
use thiserror::Error;

/// External service boundaries the pipeline talks to.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Vision,
    Synthesis,
    Reasoning,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Capability::Vision => "vision",
            Capability::Synthesis => "synthesis",
            Capability::Reasoning => "reasoning",
        })
    }
}

/// Why a measurement record was rejected. Display is the stable reason code.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, SerializeDisplay)]
pub enum ValidationError {
    #[error("out-of-range-length")] OutOfRangeLength,
    #[error("out-of-range-width")] OutOfRangeWidth,
    #[error("non-positive-area")] NonPositiveArea,
    #[error("confidence-out-of-range")] ConfidenceOutOfRange,
    #[error("unknown-shape")] UnknownShape,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CapabilityError {
    #[error("{capability} capability is not configured: {message}")]
    Configuration { capability: Capability, message: String },
    #[error("{capability} capability is rate-limited: {message}")]
    RateLimited { capability: Capability, message: String },
    #[error("{capability} capability timed out: {message}")]
    Timeout { capability: Capability, message: String },
    #[error("{capability} capability failed: {message}")]
    Upstream { capability: Capability, message: String },
}

impl CapabilityError {
    pub fn capability(&self) -> Capability {
        match self {
            CapabilityError::Configuration { capability, .. }
            | CapabilityError::RateLimited { capability, .. }
            | CapabilityError::Timeout { capability, .. }
            | CapabilityError::Upstream { capability, .. } => *capability,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            CapabilityError::Configuration { message, .. }
            | CapabilityError::RateLimited { message, .. }
            | CapabilityError::Timeout { message, .. }
            | CapabilityError::Upstream { message, .. } => message,
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Capability(#[from] CapabilityError),
    #[error("generation failed: {0}")]
    GenerationFailed(CapabilityError),
    #[error("{capability} capability returned a malformed response: {detail}")]
    MalformedResponse { capability: Capability, detail: String },
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl PipelineError {
    pub fn malformed(capability: Capability, detail: impl Into<String>) -> Self {
        PipelineError::MalformedResponse { capability, detail: detail.into() }
    }

    /// The upstream failure behind this error, if any.
    pub fn capability_error(&self) -> Option<&CapabilityError> {
        match self {
            PipelineError::Capability(e) | PipelineError::GenerationFailed(e) => Some(e),
            _ => None,
        }
    }

    /// Short machine-readable code used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::Capability(CapabilityError::Configuration { .. }) => "capability_unconfigured",
            PipelineError::Capability(CapabilityError::RateLimited { .. }) => "capability_rate_limited",
            PipelineError::Capability(_) => "capability_error",
            PipelineError::GenerationFailed(_) => "generation_failed",
            PipelineError::MalformedResponse { .. } => "malformed_response",
            PipelineError::InvalidInput(_) => "invalid_input",
        }
    }
}
