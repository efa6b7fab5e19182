//! Error types for trackblend-core.
//!
//! The controller itself has no failure modes at runtime; errors only arise
//! while building or loading a [`BlendConfig`](crate::BlendConfig).

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum BlendError {
    /// A config field holds a value the controller cannot run with.
    #[error("invalid blend config `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    /// The config document is not valid JSON for [`BlendConfig`](crate::BlendConfig).
    #[error("blend config parse error: {0}")]
    ConfigParse(String),
}

impl BlendError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        BlendError::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}
