use thiserror::Error;

#[derive(Error, Debug)]
pub enum BacklinkError {
    #[error("API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API returned status {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("Could not parse {context}: {message}")]
    Parse { context: String, message: String },

    #[error("Provider rejected the request (code {code}): {message}")]
    ProviderRejected { code: i64, message: String },

    #[error("{step} failed: {source}")]
    StepFailed {
        step: String,
        #[source]
        source: Box<BacklinkError>,
    },

    #[error("CSV processing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },
}

pub type Result<T> = std::result::Result<T, BacklinkError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Upstream,
    Data,
    Configuration,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl BacklinkError {
    pub fn parse(context: impl Into<String>, message: impl ToString) -> Self {
        Self::Parse {
            context: context.into(),
            message: message.to_string(),
        }
    }

    pub fn step(step: impl Into<String>, source: BacklinkError) -> Self {
        Self::StepFailed {
            step: step.into(),
            source: Box::new(source),
        }
    }

    /// Transport failures and non-2xx responses may succeed on a later attempt;
    /// malformed bodies and rejected requests will not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => !e.is_decode() && !e.is_builder(),
            Self::UpstreamStatus { .. } => true,
            Self::StepFailed { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Transport(_) => ErrorCategory::Network,
            Self::UpstreamStatus { .. } | Self::ProviderRejected { .. } => ErrorCategory::Upstream,
            Self::Parse { .. } | Self::Serialization(_) => ErrorCategory::Data,
            Self::StepFailed { source, .. } => source.category(),
            Self::Csv(_) | Self::Io(_) => ErrorCategory::Output,
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ConfigValidationError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network | ErrorCategory::Upstream => ErrorSeverity::Medium,
            ErrorCategory::Data | ErrorCategory::Output => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            Self::Transport(_) => {
                "Check network connectivity to the provider and retry".to_string()
            }
            Self::UpstreamStatus { status, .. } if *status == 401 || *status == 403 => {
                "Check the provider credentials (AHREFS_API_KEY, DATAFORSEO_LOGIN / DATAFORSEO_API_KEY)"
                    .to_string()
            }
            Self::UpstreamStatus { status, .. } if *status == 429 => {
                "The provider is throttling requests; lower --requests-per-second and retry"
                    .to_string()
            }
            Self::UpstreamStatus { .. } => "The provider returned an error; retry later".to_string(),
            Self::Parse { .. } => {
                "The provider answered with an unexpected payload; check the target and API version"
                    .to_string()
            }
            Self::ProviderRejected { .. } => {
                "Check the target URL and query options accepted by the provider".to_string()
            }
            Self::StepFailed { source, .. } => source.recovery_suggestion(),
            Self::Csv(_) | Self::Io(_) | Self::Serialization(_) => {
                "Check that the output path exists and is writable".to_string()
            }
            Self::MissingConfigError { field } => format!("Provide a value for '{}'", field),
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ConfigValidationError { .. } => {
                "Fix the configuration value and run again".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::StepFailed { step, source } if source.is_retryable() => {
                format!("{} failed and can be retried: {}", step, source)
            }
            Self::StepFailed { step, source } => format!("{} failed: {}", step, source),
            Self::Transport(_) => "Could not reach the backlink provider".to_string(),
            other => other.to_string(),
        }
    }
}
