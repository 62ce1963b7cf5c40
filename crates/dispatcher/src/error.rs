//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Required sink parameter absent
    #[error("sink '{sink}' requires parameter '{param}'")]
    MissingParam { sink: String, param: &'static str },

    /// Sink parameter present but unusable
    #[error("sink '{sink}': invalid value '{value}' for parameter '{param}'")]
    InvalidParam {
        sink: String,
        param: &'static str,
        value: String,
    },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatcherError {
    pub fn missing_param(sink: impl Into<String>, param: &'static str) -> Self {
        Self::MissingParam {
            sink: sink.into(),
            param,
        }
    }

    pub fn invalid_param(
        sink: impl Into<String>,
        param: &'static str,
        value: impl Into<String>,
    ) -> Self {
        Self::InvalidParam {
            sink: sink.into(),
            param,
            value: value.into(),
        }
    }
}
