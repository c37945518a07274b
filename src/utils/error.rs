use thiserror::Error;

#[derive(Error, Debug)]
pub enum PluginError {
    #[error("Missing PagerDuty API token")]
    MissingToken,

    #[error("Request failed with {status}, {message}")]
    Upstream { status: u16, message: String },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to materialize repository tree: {message}")]
    TreeMaterialization { message: String },

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("No location annotation '{annotation}' provided in entity")]
    MissingAnnotation { annotation: String },

    #[error("Invalid documentation reference '{value}': {reason}")]
    InvalidDocRef { value: String, reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

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
    Network,
    Repository,
    Internal,
}

impl PluginError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            PluginError::MissingToken
            | PluginError::ConfigError { .. }
            | PluginError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            PluginError::Upstream { .. } => ErrorCategory::Upstream,
            PluginError::Transport(_) => ErrorCategory::Network,
            PluginError::TreeMaterialization { .. }
            | PluginError::Archive(_)
            | PluginError::MissingAnnotation { .. }
            | PluginError::InvalidDocRef { .. } => ErrorCategory::Repository,
            PluginError::IoError(_) | PluginError::SerializationError(_) => {
                ErrorCategory::Internal
            }
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            PluginError::MissingToken => {
                "Set pagerduty.api_token in the config file or pass --api-token"
            }
            PluginError::Upstream { status: 401, .. } | PluginError::Upstream { status: 403, .. } => {
                "Check that the PagerDuty API token is valid and has read access"
            }
            PluginError::Upstream { .. } => "Check the PagerDuty API status and retry later",
            PluginError::Transport(_) => "Check network connectivity to the upstream API",
            PluginError::TreeMaterialization { .. } | PluginError::Archive(_) => {
                "Check that the repository URL is reachable and serves a zip archive"
            }
            PluginError::MissingAnnotation { .. } => {
                "Add a backstage.io/techdocs-ref annotation to the entity metadata"
            }
            PluginError::InvalidDocRef { .. } => {
                "Use the form url:https://<host>/<owner>/<repo>/blob/<ref>/<path>/mkdocs.yml"
            }
            PluginError::ConfigError { .. } | PluginError::InvalidConfigValueError { .. } => {
                "Fix the configuration file and restart"
            }
            PluginError::IoError(_) => "Check file permissions and available disk space",
            PluginError::SerializationError(_) => "Check that the input is valid JSON",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Upstream => format!("Upstream API rejected the request: {}", self),
            ErrorCategory::Network => format!("Could not reach the upstream API: {}", self),
            ErrorCategory::Repository => format!("Could not resolve documentation: {}", self),
            ErrorCategory::Internal => format!("Internal error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, PluginError>;
