use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Map service unavailable: {message}")]
    MapUnavailable { message: String },

    #[error("Routing request failed: {0}")]
    RoutingHttpError(#[from] reqwest::Error),

    #[error("Routing error: {message}")]
    RoutingError { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Upstream,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EngineError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EngineError::ConfigError { .. }
            | EngineError::MissingConfigError { .. }
            | EngineError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            EngineError::MapUnavailable { .. }
            | EngineError::RoutingHttpError(_)
            | EngineError::RoutingError { .. } => ErrorCategory::Upstream,
            EngineError::SerializationError(_) => ErrorCategory::Data,
            EngineError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // a failed route only hides the directions affordance
            EngineError::RoutingHttpError(_) | EngineError::RoutingError { .. } => {
                ErrorSeverity::Low
            }
            EngineError::SerializationError(_) => ErrorSeverity::Medium,
            EngineError::ConfigError { .. }
            | EngineError::MissingConfigError { .. }
            | EngineError::InvalidConfigValueError { .. } => ErrorSeverity::High,
            EngineError::MapUnavailable { .. } | EngineError::IoError(_) => {
                ErrorSeverity::Critical
            }
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            EngineError::MapUnavailable { .. } => {
                "Reload the page or session; the map surface is not retried automatically".to_string()
            }
            EngineError::RoutingHttpError(_) | EngineError::RoutingError { .. } => {
                "Check the routing endpoint and try the directions request again".to_string()
            }
            EngineError::IoError(_) => "Check that the file exists and is readable".to_string(),
            EngineError::SerializationError(_) => {
                "Make sure the listings file is a JSON array of listing objects".to_string()
            }
            EngineError::ConfigError { .. } => {
                "Check the TOML syntax of the configuration file".to_string()
            }
            EngineError::MissingConfigError { field } => {
                format!("Add the '{}' setting to the configuration", field)
            }
            EngineError::InvalidConfigValueError { field, .. } => {
                format!("Fix the value of '{}' in the configuration", field)
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EngineError::MapUnavailable { .. } => "The map could not be displayed".to_string(),
            EngineError::RoutingHttpError(_) | EngineError::RoutingError { .. } => {
                "Directions are not available right now".to_string()
            }
            EngineError::IoError(e) => format!("Could not read or write a file: {}", e),
            EngineError::SerializationError(e) => format!("Could not parse data: {}", e),
            EngineError::ConfigError { message } => format!("Invalid configuration: {}", message),
            EngineError::MissingConfigError { field } => {
                format!("Missing configuration value: {}", field)
            }
            EngineError::InvalidConfigValueError { field, reason, .. } => {
                format!("Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
