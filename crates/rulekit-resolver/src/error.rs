/// Resolver error types
use thiserror::Error;

pub type ResolveResult<T> = Result<T, ResolveError>;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Target '{target}' depends on '{dependency}', which is not defined")]
    UnresolvedDependency { target: String, dependency: String },

    #[error("Cyclic dependency: {}", .path.join(" -> "))]
    CyclicDependency { path: Vec<String> },

    #[error(
        "No condition of target '{target}' matches platform '{platform}' and there is no //conditions:default entry"
    )]
    NoMatchingCondition { target: String, platform: String },

    #[error("Target not found: {target}")]
    TargetNotFound { target: String },

    #[error("Target '{target}' is defined more than once")]
    DuplicateTarget { target: String },

    #[error("Invalid target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("Platform '{platform}' appears more than once in a constraint map")]
    DuplicateCondition { platform: String },

    #[error("Invalid platform identifier '{0}'")]
    InvalidPlatform(String),

    #[error("Host platform '{0}' has no host tools")]
    NoHostTools(String),

    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    #[error("Failed to encode resolution: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] rulekit_config::ConfigError),
}

impl ResolveError {
    /// Create an unresolved dependency error
    pub fn unresolved(target: impl Into<String>, dependency: impl Into<String>) -> Self {
        Self::UnresolvedDependency {
            target: target.into(),
            dependency: dependency.into(),
        }
    }

    /// Create an invalid target error
    pub fn invalid_target(target: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidTarget {
            target: target.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a target not found error
    pub fn target_not_found(target: impl Into<String>) -> Self {
        Self::TargetNotFound {
            target: target.into(),
        }
    }

    /// Whether the error comes from the declared configuration rather than the request
    pub fn is_configuration_error(&self) -> bool {
        !matches!(
            self,
            Self::TargetNotFound { .. } | Self::InvalidPlatform(_) | Self::WorkerPool(_)
        )
    }
}
