use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Lookup service answered with status {status}")]
    UnexpectedStatus { status: u16 },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Query pipeline is closed")]
    PipelineClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Data,
    Configuration,
    System,
}

impl RelayError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            RelayError::ApiError(_) | RelayError::UnexpectedStatus { .. } => {
                ErrorCategory::Network
            }
            RelayError::SerializationError(_) => ErrorCategory::Data,
            RelayError::ConfigValidationError { .. }
            | RelayError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            RelayError::IoError(_) | RelayError::PipelineClosed => ErrorCategory::System,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check the lookup endpoint, the API key and network access",
            ErrorCategory::Data => "The lookup service returned an unexpected payload",
            ErrorCategory::Configuration => "Fix the configuration file or command line flags",
            ErrorCategory::System => "Restart the relay; the pipeline is no longer running",
        }
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
